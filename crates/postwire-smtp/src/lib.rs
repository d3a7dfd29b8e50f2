//! # postwire-smtp
//!
//! An asynchronous SMTP submission client (RFC 5321).
//!
//! ## Features
//!
//! - **Runtime state checks**: greeting, EHLO, AUTH and the mail
//!   transaction are gated by [`SmtpState`]
//! - **TLS support**: implicit TLS (port 465) and STARTTLS (port 587)
//! - **Authentication**: AUTH LOGIN, with AUTH PLAIN as fallback
//! - **Extensions**: SIZE is checked before sending; 8BITMIME, PIPELINING
//!   and AUTH are parsed from EHLO
//! - **Deadlines**: every reply is awaited with a timeout
//!
//! ## Quick Start
//!
//! ```no_run
//! use postwire_smtp::{Address, Client, Config};
//!
//! # async fn run() -> postwire_smtp::Result<()> {
//! let config = Config::builder("smtp.example.com")
//!     .ehlo_hostname("client.example.com")
//!     .build();
//! let mut client = Client::connect(&config).await?;
//! client.authenticate("user@example.com", "password").await?;
//!
//! let from = Address::new("sender@example.com")?;
//! let to = [Address::new("recipient@example.com")?];
//! client
//!     .send(&from, &to, b"Subject: Test\r\n\r\nHello, World!\r\n")
//!     .await?;
//!
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command serialization and DATA preparation
//! - [`connection`]: configuration, streams and the client
//! - [`parser`]: reply decoder
//! - [`types`]: addresses, extensions and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, prepare_data};
pub use connection::{Client, Config, ConfigBuilder, Security, ServerInfo, SmtpState, SmtpStream};
pub use error::{Error, Result};
pub use parser::{ReplyAccumulator, ReplyLine, parse_line, parse_reply};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCategory, ReplyCode};

/// SMTP protocol version supported.
pub const SMTP_VERSION: &str = "SMTP/ESMTP (RFC 5321)";
