//! Mail services.
//!
//! Bridges an [`Account`](crate::Account) to the IMAP, SMTP and MIME
//! libraries.

pub mod mail;
pub mod smtp;

pub use mail::{
    Folder, FolderType, ImapClient, MailServiceError, MessageContent, connect_imap,
    fetch_message, list_folders, login,
};
pub use smtp::{OutgoingMessage, PreparedMessage, SmtpError, send_email, submit};
