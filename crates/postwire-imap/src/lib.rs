//! # postwire-imap
//!
//! An asynchronous IMAP4rev1 client (RFC 3501).
//!
//! ## Features
//!
//! - **Tag correlation**: each command gets a unique tag (`A001`, `A002`, ...)
//!   and a background reader routes untagged data and completions back to
//!   the waiting caller
//! - **Runtime state checks**: operations that need a login or a selected
//!   mailbox fail before anything is written
//! - **Literals**: `{n}` payloads are framed by byte count, never by line
//! - **Deadlines**: a command that does not complete in time fails with
//!   [`Error::Timeout`] and the connection is abandoned
//! - **TLS via rustls**: implicit TLS or STARTTLS without OpenSSL
//! - **Sans-I/O parser**: response decoding is separate from network I/O
//!
//! ## Quick Start
//!
//! ```no_run
//! use postwire_imap::{Client, Config, FetchItems, SearchCriteria, UidSet};
//!
//! # async fn run() -> postwire_imap::Result<()> {
//! let config = Config::new("imap.example.com");
//! let mut client = Client::connect(&config).await?;
//! client.login("user@example.com", "password").await?;
//!
//! for folder in client.list("", "*").await? {
//!     println!("{}", folder.name);
//! }
//!
//! let status = client.select("INBOX").await?;
//! println!("{} messages", status.exists);
//!
//! let unseen = client.uid_search(SearchCriteria::Unseen).await?;
//! if let Some(uids) = UidSet::from_ids(&unseen) {
//!     for (_, message) in client.uid_fetch(&uids, FetchItems::summary()).await? {
//!         println!("{:?}", message.envelope.and_then(|e| e.subject));
//!     }
//! }
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command builders and serialization
//! - [`connection`]: framing, correlation and the client
//! - [`parser`]: sans-I/O response decoder
//! - [`types`]: flags, mailboxes and sequence sets

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{
    Command, FetchAttribute, FetchItems, SearchCriteria, StoreMode, TagGenerator,
};
pub use connection::{
    Client, CommandResult, Config, ConfigBuilder, FramedStream, ImapStream, LineFramer,
    ProtocolState, ResponseFramer, Security,
};
pub use error::{Error, Result};
pub use parser::{
    Address, DecodeError, Envelope, FetchData, ParsedResponse, ResponseCode, ResponseParser,
    Status, StatusText, TaggedResponse,
};
pub use types::{
    Flag, Folder, MailboxAttribute, MailboxStatus, SequenceSet, UidSet, format_flag_list,
};

/// IMAP protocol version implemented.
pub const IMAP_VERSION: &str = "IMAP4rev1";
