//! Error types for the postwire facade.

use thiserror::Error;

use crate::service::{MailServiceError, SmtpError};

/// Errors that can occur in account handling and mail services.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP service operation failed.
    #[error(transparent)]
    Mail(#[from] MailServiceError),

    /// Sending failed.
    #[error(transparent)]
    Smtp(#[from] SmtpError),

    /// Account file is not valid JSON.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Account file does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account settings are incomplete.
    #[error("Invalid account: {0}")]
    InvalidAccount(#[from] crate::account::ValidationError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
