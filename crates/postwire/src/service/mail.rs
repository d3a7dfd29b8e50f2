//! Mail service for IMAP operations.
//!
//! Connects with the account's settings, lists folders and downloads
//! messages as parsed MIME trees.

use chrono::{DateTime, FixedOffset};
use postwire_imap::{Client, ImapStream, MailboxAttribute};
use postwire_mime::{Attachment, Mailbox, Message};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::account::Account;

/// Errors that can occur during mail operations.
#[derive(Debug, thiserror::Error)]
pub enum MailServiceError {
    /// The server could not be reached or the connection was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// LOGIN was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The folder does not exist or cannot be opened.
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// The server returned no message for the UID.
    #[error("Message {uid} could not be fetched: {reason}")]
    MessageFetch {
        /// Requested UID.
        uid: u32,
        /// Server or client explanation.
        reason: String,
    },

    /// The downloaded message is not valid MIME.
    #[error("Message could not be parsed: {0}")]
    Parse(#[from] postwire_mime::Error),

    /// The server did not answer in time.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl From<postwire_imap::Error> for MailServiceError {
    fn from(err: postwire_imap::Error) -> Self {
        use postwire_imap::Error as Imap;
        match err {
            Imap::ConnectionFailed { .. } | Imap::Tls(_) | Imap::NetworkUnavailable(_) => {
                Self::Connection(err.to_string())
            }
            Imap::AuthenticationFailed(reason) => Self::Authentication(reason),
            Imap::FolderNotFound(name) => Self::FolderNotFound(name),
            Imap::Timeout(after) => Self::Timeout(after),
            other => Self::Operation(other.to_string()),
        }
    }
}

/// Type alias for an IMAP client over TCP or TLS.
pub type ImapClient = Client<ImapStream>;

/// A folder in the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Last path component.
    pub name: String,
    /// Full path as used with SELECT.
    pub path: String,
    /// Hierarchy delimiter, if the server has one.
    pub delimiter: Option<String>,
    /// Whether the folder is selectable.
    pub selectable: bool,
    /// Whether this folder has children.
    pub has_children: bool,
    /// Folder role (inbox, sent, drafts, etc.).
    pub folder_type: FolderType,
}

/// Type of folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderType {
    /// Inbox folder.
    Inbox,
    /// Sent mail folder.
    Sent,
    /// Drafts folder.
    Drafts,
    /// Trash folder.
    Trash,
    /// Spam/junk folder.
    Spam,
    /// Archive folder.
    Archive,
    /// Regular folder.
    Regular,
}

impl FolderType {
    /// Detect folder type from its SPECIAL-USE attribute, falling back to
    /// the name.
    #[must_use]
    pub fn detect(path: &str, special_use: Option<&MailboxAttribute>) -> Self {
        match special_use {
            Some(MailboxAttribute::Sent) => Self::Sent,
            Some(MailboxAttribute::Drafts) => Self::Drafts,
            Some(MailboxAttribute::Trash) => Self::Trash,
            Some(MailboxAttribute::Junk) => Self::Spam,
            Some(MailboxAttribute::Archive) => Self::Archive,
            _ => Self::from_name(path),
        }
    }

    /// Detect folder type from name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower == "inbox" {
            Self::Inbox
        } else if lower.contains("sent") {
            Self::Sent
        } else if lower.contains("draft") {
            Self::Drafts
        } else if lower.contains("trash") || lower.contains("deleted") {
            Self::Trash
        } else if lower.contains("spam") || lower.contains("junk") {
            Self::Spam
        } else if lower.contains("archive") {
            Self::Archive
        } else {
            Self::Regular
        }
    }

    /// Short label for listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Drafts => "drafts",
            Self::Trash => "trash",
            Self::Spam => "spam",
            Self::Archive => "archive",
            Self::Regular => "",
        }
    }
}

/// Full content of an email message.
#[derive(Debug, Clone)]
pub struct MessageContent {
    /// Unique identifier.
    pub uid: u32,
    /// Decoded subject, empty if absent.
    pub subject: String,
    /// Sender addresses.
    pub from: Vec<Mailbox>,
    /// Recipient addresses.
    pub to: Vec<Mailbox>,
    /// CC addresses.
    pub cc: Vec<Mailbox>,
    /// Parsed Date header.
    pub date: Option<DateTime<FixedOffset>>,
    /// Message-ID without angle brackets.
    pub message_id: Option<String>,
    /// Plain text body.
    pub body_text: Option<String>,
    /// HTML body.
    pub body_html: Option<String>,
    /// Attachments, inline parts included.
    pub attachments: Vec<Attachment>,
    /// Size of the raw message in bytes.
    pub size: usize,
}

impl MessageContent {
    fn from_message(uid: u32, message: &Message, size: usize) -> Self {
        Self {
            uid,
            subject: message.subject().unwrap_or_default(),
            from: message.from(),
            to: message.to(),
            cc: message.cc(),
            date: message.date(),
            message_id: message.message_id().map(ToString::to_string),
            body_text: message.text_body().map(ToString::to_string),
            body_html: message.html_body().map(ToString::to_string),
            attachments: message.attachments(),
            size,
        }
    }
}

/// Connect to the account's IMAP server and authenticate.
///
/// The account's security mode decides between implicit TLS, STARTTLS and
/// plaintext.
///
/// # Errors
///
/// Returns an error if connection or authentication fails.
pub async fn connect_imap(account: &Account) -> Result<ImapClient, MailServiceError> {
    let config = account.imap.client_config(account.command_timeout());
    info!(
        host = %config.host,
        port = config.port,
        security = account.imap.security.display_name(),
        "connecting to IMAP server"
    );
    let mut client = Client::connect(&config).await?;
    login(&mut client, account).await?;
    Ok(client)
}

/// Authenticate an already connected client with the account's credentials.
///
/// # Errors
///
/// Returns [`MailServiceError::Authentication`] if the server rejects them.
pub async fn login<S>(client: &mut Client<S>, account: &Account) -> Result<(), MailServiceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    client
        .login(&account.imap.username, &account.imap.password)
        .await?;
    Ok(())
}

/// List all folders from an authenticated client.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub async fn list_folders<S>(client: &mut Client<S>) -> Result<Vec<Folder>, MailServiceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mailboxes = client.list("", "*").await?;

    let folders: Vec<Folder> = mailboxes
        .into_iter()
        .map(|mb| {
            let name = mb
                .delimiter
                .as_deref()
                .and_then(|d| mb.name.rsplit_once(d))
                .map_or_else(|| mb.name.clone(), |(_, n)| n.to_string());
            let attributes = mb.parsed_attributes();

            Folder {
                name,
                selectable: mb.is_selectable(),
                has_children: attributes.contains(&MailboxAttribute::HasChildren),
                folder_type: FolderType::detect(&mb.name, mb.special_use().as_ref()),
                delimiter: mb.delimiter,
                path: mb.name,
            }
        })
        .collect();

    debug!(count = folders.len(), "listed folders");
    Ok(folders)
}

/// Download one message by UID and parse it.
///
/// Opens `folder` read-only unless it is already selected. The body is
/// fetched with `BODY.PEEK[]`, so `\Seen` is left untouched.
///
/// # Errors
///
/// Returns [`MailServiceError::FolderNotFound`] if the folder cannot be
/// opened, [`MailServiceError::MessageFetch`] if the UID does not exist
/// and [`MailServiceError::Parse`] if the message is not valid MIME.
pub async fn fetch_message<S>(
    client: &mut Client<S>,
    folder: &str,
    uid: u32,
) -> Result<MessageContent, MailServiceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if client.selected_mailbox() != Some(folder) {
        client.examine(folder).await?;
    }

    let raw = client.fetch_body_peek(uid).await.map_err(|e| match e {
        postwire_imap::Error::MessageFetchFailed(reason) => {
            MailServiceError::MessageFetch { uid, reason }
        }
        other => other.into(),
    })?;

    let message = Message::parse(&raw)?;
    let content = MessageContent::from_message(uid, &message, raw.len());
    debug!(
        uid,
        bytes = content.size,
        attachments = content.attachments.len(),
        "fetched message"
    );
    Ok(content)
}
