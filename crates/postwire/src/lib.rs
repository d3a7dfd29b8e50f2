//! # postwire
//!
//! Account configuration and high-level mail services on top of
//! `postwire-imap`, `postwire-smtp` and `postwire-mime`.
//!
//! This crate provides:
//! - [`Account`], stored as JSON in the user's config directory
//! - [`connect_imap`], [`list_folders`] and [`fetch_message`]
//! - [`send_email`], which composes MIME and submits it over SMTP
//!
//! The `postwire` binary exposes these as command line subcommands.
//!
//! ```no_run
//! use postwire::{Account, OutgoingMessage, connect_imap, list_folders, send_email};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let account = Account::load(&Account::default_path()?).await?;
//!
//! let mut client = connect_imap(&account).await?;
//! for folder in list_folders(&mut client).await? {
//!     println!("{}", folder.path);
//! }
//! client.logout().await?;
//!
//! let message = OutgoingMessage::new(account.sender(), "Hello", "Sent with postwire")
//!     .to("friend@example.org");
//! send_email(&account, &message).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;
pub mod service;

pub use account::{Account, ImapConfig, Security, SmtpConfig, ValidationError};
pub use error::{Error, Result};
pub use service::{
    Folder, FolderType, ImapClient, MailServiceError, MessageContent, OutgoingMessage,
    PreparedMessage, SmtpError, connect_imap, fetch_message, list_folders, login, send_email,
    submit,
};
