//! Response data types.

use crate::types::{Flag, Folder};

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or unknown to the server.
    Bad,
}

impl Status {
    /// Returns the wire token for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        }
    }
}

/// Bracketed response code, e.g. `[UIDVALIDITY 42]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: text that must be shown to the user.
    Alert,
    /// CAPABILITY list piggybacked on a status line.
    Capability(Vec<String>),
    /// PERMANENTFLAGS: flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: mailbox selected as read-write.
    ReadWrite,
    /// TRYCREATE: target mailbox does not exist.
    TryCreate,
    /// UIDNEXT: next UID to be assigned.
    UidNext(u32),
    /// UIDVALIDITY value.
    UidValidity(u32),
    /// UNSEEN: first unseen sequence number.
    Unseen(u32),
    /// Any other code, kept verbatim without brackets.
    Other(String),
}

/// Text of a status response with its optional response code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    /// Parsed response code, if the text starts with one.
    pub code: Option<ResponseCode>,
    /// Full text after the status keyword, response code included.
    pub text: String,
}

/// Tagged command completion line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResponse {
    /// Tag echoed from the command.
    pub tag: String,
    /// Completion status.
    pub status: Status,
    /// Parsed response code, if any.
    pub code: Option<ResponseCode>,
    /// Everything after the status token.
    pub message: String,
}

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Email address from envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Mailbox name (local part).
    pub mailbox: Option<String>,
    /// Host name (domain part).
    pub host: Option<String>,
}

impl Address {
    /// Returns the full email address.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Data items of one FETCH response. Absent items stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchData {
    /// Message UID.
    pub uid: Option<u32>,
    /// Message flags.
    pub flags: Option<Vec<Flag>>,
    /// `RFC822.SIZE`.
    pub size: Option<u32>,
    /// `INTERNALDATE`, not date-parsed.
    pub internal_date: Option<String>,
    /// Parsed envelope.
    pub envelope: Option<Envelope>,
    /// Raw `BODYSTRUCTURE` (or structure-form `BODY`) span, parens included.
    pub body_structure: Option<String>,
    /// Full message bytes from `BODY[]` or `RFC822`.
    pub rfc822: Option<Vec<u8>>,
    /// Header bytes from `BODY[HEADER…]` or `RFC822.HEADER`.
    pub header: Option<Vec<u8>>,
    /// Body text bytes from `BODY[TEXT]` or `RFC822.TEXT`.
    pub text: Option<Vec<u8>>,
}

/// A decoded IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// Untagged `OK`: the greeting and in-session status lines.
    Greeting(StatusText),
    /// Untagged `PREAUTH` greeting.
    PreAuth(StatusText),
    /// Untagged `BYE`.
    Bye(String),
    /// Untagged `CAPABILITY` list.
    Capability(Vec<String>),
    /// Tagged completion.
    Tagged(TaggedResponse),
    /// Any other untagged line (`* NO`, `* BAD`, unmodelled data), raw.
    Untagged(String),
    /// Continuation request, text after `+`.
    Continuation(String),
    /// `<n> EXISTS`.
    Exists(u32),
    /// `<n> RECENT`.
    Recent(u32),
    /// `<n> EXPUNGE`.
    Expunge(u32),
    /// `FLAGS (...)`.
    Flags(Vec<Flag>),
    /// `LIST (attrs) "delim" name`.
    List(Folder),
    /// `SEARCH n n n`.
    Search(Vec<u32>),
    /// `<seq> FETCH (...)`.
    Fetch(u32, Box<FetchData>),
    /// Line that could not be decoded, raw.
    Unknown(String),
}
