//! Mailbox types.

use super::Flag;

/// Folder entry from a LIST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Mailbox name as sent by the server.
    pub name: String,
    /// Hierarchy delimiter; `None` when the server answered `NIL`.
    pub delimiter: Option<String>,
    /// Raw attribute strings, e.g. `\HasNoChildren`.
    pub attributes: Vec<String>,
}

impl Folder {
    /// Returns the parsed attributes.
    #[must_use]
    pub fn parsed_attributes(&self) -> Vec<MailboxAttribute> {
        self.attributes
            .iter()
            .map(|a| MailboxAttribute::parse(a))
            .collect()
    }

    /// Returns `true` unless the folder carries `\Noselect`.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .parsed_attributes()
            .iter()
            .any(|a| matches!(a, MailboxAttribute::NoSelect | MailboxAttribute::NonExistent))
    }

    /// Returns the SPECIAL-USE role of this folder, if any.
    #[must_use]
    pub fn special_use(&self) -> Option<MailboxAttribute> {
        self.parsed_attributes().into_iter().find(|a| {
            matches!(
                a,
                MailboxAttribute::All
                    | MailboxAttribute::Archive
                    | MailboxAttribute::Drafts
                    | MailboxAttribute::Flagged
                    | MailboxAttribute::Junk
                    | MailboxAttribute::Sent
                    | MailboxAttribute::Trash
            )
        })
    }
}

/// Mailbox attributes from LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox does not exist (RFC 5258).
    NonExistent,
    /// Mailbox cannot have children.
    NoInferiors,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    // SPECIAL-USE mailbox attributes (RFC 6154)
    /// All messages (virtual mailbox).
    All,
    /// Mailbox is the archive folder.
    Archive,
    /// Mailbox is the drafts folder.
    Drafts,
    /// Flagged/starred messages (virtual mailbox).
    Flagged,
    /// Mailbox is the junk/spam folder.
    Junk,
    /// Mailbox is the sent folder.
    Sent,
    /// Mailbox is the trash folder.
    Trash,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NONEXISTENT" => Self::NonExistent,
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            "\\ALL" => Self::All,
            "\\ARCHIVE" => Self::Archive,
            "\\DRAFTS" => Self::Drafts,
            "\\FLAGGED" => Self::Flagged,
            "\\JUNK" | "\\SPAM" => Self::Junk,
            "\\SENT" => Self::Sent,
            "\\TRASH" => Self::Trash,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

/// Mailbox status information from SELECT/EXAMINE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Selected mailbox name.
    pub name: String,
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// First unseen message sequence number.
    pub unseen: Option<u32>,
    /// Next UID to be assigned.
    pub uid_next: Option<u32>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<u32>,
    /// Flags defined for this mailbox.
    pub flags: Vec<Flag>,
    /// Flags that can be permanently stored.
    pub permanent_flags: Vec<Flag>,
    /// Whether the mailbox is read-only.
    pub read_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(attrs: &[&str]) -> Folder {
        Folder {
            name: "X".to_string(),
            delimiter: Some("/".to_string()),
            attributes: attrs.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn attribute_parse() {
        assert_eq!(MailboxAttribute::parse("\\Noselect"), MailboxAttribute::NoSelect);
        assert_eq!(MailboxAttribute::parse("\\Spam"), MailboxAttribute::Junk);
        assert_eq!(
            MailboxAttribute::parse("\\Custom"),
            MailboxAttribute::Unknown("\\Custom".to_string())
        );
    }

    #[test]
    fn selectable() {
        assert!(folder(&["\\HasNoChildren"]).is_selectable());
        assert!(!folder(&["\\Noselect", "\\HasChildren"]).is_selectable());
    }

    #[test]
    fn special_use() {
        assert_eq!(
            folder(&["\\HasNoChildren", "\\Sent"]).special_use(),
            Some(MailboxAttribute::Sent)
        );
        assert_eq!(folder(&["\\HasNoChildren"]).special_use(), None);
    }
}
