//! Error types for the IMAP library.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection could not be established, or it has been lost and
    /// the client can no longer be used.
    #[error("Connection to {host}:{port} failed")]
    ConnectionFailed {
        /// Server host.
        host: String,
        /// Server port.
        port: u16,
    },

    /// LOGIN was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// SELECT or EXAMINE named a folder the server rejected.
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// A FETCH completed without the requested data.
    #[error("Message fetch failed: {0}")]
    MessageFetchFailed(String),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered NO or BAD.
    #[error("Server error: {0}")]
    ServerError(String),

    /// A command did not complete within the configured deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[from] std::io::Error),

    /// The operation needs a selected folder.
    #[error("No folder selected")]
    NoFolderSelected,

    /// The operation is not valid in the current protocol state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The server sent data that violates the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Self::Tls(err.to_string())
    }
}

impl From<rustls::pki_types::InvalidDnsNameError> for Error {
    fn from(err: rustls::pki_types::InvalidDnsNameError) -> Self {
        Self::Tls(format!("invalid DNS name: {err}"))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
