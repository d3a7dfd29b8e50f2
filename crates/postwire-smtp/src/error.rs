//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server could not be reached, refused the session or the
    /// connection has already failed.
    #[error("Connection to {host}:{port} failed")]
    ConnectionFailed {
        /// Server hostname.
        host: String,
        /// Server port.
        port: u16,
    },

    /// The server rejected the credentials or the exchange broke off.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Unexpected reply to a command outside the mail transaction.
    #[error("SMTP error {code}: {message}")]
    ServerError {
        /// Reply code (e.g., 502).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// MAIL FROM, DATA or the final `.` was refused.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// A recipient was permanently refused.
    #[error("Recipient rejected: {0}")]
    RecipientRejected(String),

    /// The message exceeds the limit the server advertised with SIZE.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Size of the prepared message.
        size: usize,
        /// Advertised limit.
        limit: usize,
    },

    /// No reply arrived within the command deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[from] io::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// Malformed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the server reported a permanent failure (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::ServerError { code, .. } if *code >= 500 && *code < 600)
            || matches!(self, Self::RecipientRejected(_))
    }

    /// Returns true if the server reported a transient failure (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ServerError { code, .. } if *code >= 400 && *code < 500)
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Self::Tls(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let permanent = Error::ServerError {
            code: 554,
            message: "no".into(),
        };
        assert!(permanent.is_permanent());
        assert!(!permanent.is_transient());

        let transient = Error::ServerError {
            code: 451,
            message: "later".into(),
        };
        assert!(transient.is_transient());
        assert!(Error::RecipientRejected("a@b.c".into()).is_permanent());
        assert!(!Error::Timeout(Duration::from_secs(1)).is_permanent());
    }

    #[test]
    fn display() {
        let e = Error::MessageTooLarge {
            size: 20,
            limit: 10,
        };
        assert_eq!(
            e.to_string(),
            "Message of 20 bytes exceeds server limit of 10 bytes"
        );
    }
}
