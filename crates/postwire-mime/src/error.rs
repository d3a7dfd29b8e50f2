//! Errors raised while parsing or building messages.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse and build failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value without a `type/subtype` pair.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// A base64 body that still fails to decode after whitespace removal.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// `multipart/*` with no `boundary` parameter.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// A multipart body whose delimiter lines cannot be found.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// The builder was not given a header it needs, such as `From`.
    #[error("Missing required header: {0}")]
    MissingHeader(String),
}
