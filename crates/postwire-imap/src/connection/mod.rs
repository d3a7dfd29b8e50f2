//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, deadlines)
//! - TLS/plaintext stream abstraction with STARTTLS upgrade
//! - Response framing with `{n}` literal support
//! - Tag correlation between the reader task and callers
//! - The client and its protocol state

mod client;
mod collector;
mod config;
mod framed;
mod state;
mod stream;

pub use client::Client;
pub use collector::{Collector, CommandResult, Failure, Waiter};
pub use config::{
    Config, ConfigBuilder, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Security,
};
pub use framed::{FramedStream, LineFramer, MAX_LITERAL_SIZE, ResponseFramer};
pub use state::{ProtocolState, SelectedState};
pub use stream::{ImapStream, create_tls_connector, open};
