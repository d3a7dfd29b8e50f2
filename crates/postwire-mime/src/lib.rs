//! # postwire-mime
//!
//! MIME message parsing and generation for email.
//!
//! ## Features
//!
//! - **Parsing**: RFC 5322 headers, transfer decoding and multipart trees
//! - **Building**: single-part, `multipart/alternative` and `multipart/mixed`
//!   messages with base64 attachments and inline `cid:` parts
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 and RFC 2231
//!
//! ## Parsing
//!
//! ```
//! use postwire_mime::Message;
//!
//! let raw = b"From: Alice <alice@example.com>\r\n\
//!             Subject: Test\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Test"));
//! assert_eq!(message.text_body(), Some("Hello, World!"));
//! # Ok::<(), postwire_mime::Error>(())
//! ```
//!
//! ## Building
//!
//! ```
//! use postwire_mime::{MessageBuilder, OutgoingAttachment};
//!
//! let bytes = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Report")
//!     .text_body("Plain text version")
//!     .html_body("<p>HTML version</p>")
//!     .attach(OutgoingAttachment::new("report.pdf", "application/pdf", b"%PDF".to_vec()))
//!     .build()?;
//! assert!(bytes.starts_with(b"From: sender@example.com\r\n"));
//! # Ok::<(), postwire_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod builder;
mod content_type;
mod error;
mod header;
mod message;
mod parser;

pub mod encoding;

pub use address::{Mailbox, format_address_list, parse_address_list};
pub use attachment::{
    Attachment, extension_for, extract_attachments, is_attachment, mime_type_for,
};
pub use builder::{MessageBuilder, OutgoingAttachment};
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Body, Message, Part, TransferEncoding};
