//! MIME message structure and handling.

use crate::address::{Mailbox, parse_address_list};
use crate::attachment::{Attachment, extract_attachments};
use crate::content_type::{ContentDisposition, ContentType};
use crate::header::Headers;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from a header value.
    ///
    /// Unknown tokens are treated as 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Decoded body of a MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Plain text, or any non-multipart type without a dedicated variant.
    Text(String),
    /// HTML text.
    Html(String),
    /// Child parts of a multipart entity, in wire order.
    Multipart(Vec<Part>),
}

/// A node in the MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Parsed `Content-Type`, defaulting to `text/plain`.
    pub content_type: ContentType,
    /// Decoded body.
    pub body: Body,
    /// Transfer-decoded bytes of a leaf part. Empty for multipart parts.
    pub data: Vec<u8>,
}

impl Part {
    /// Returns the transfer encoding declared by the part headers.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the parsed `Content-Disposition`, if present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Returns the `Content-ID` without its angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Returns true if this part has children.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Returns the child parts, or an empty slice for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Part] {
        match &self.body {
            Body::Multipart(parts) => parts,
            Body::Text(_) | Body::Html(_) => &[],
        }
    }
}

/// A parsed RFC 5322 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    root: Part,
}

impl Message {
    pub(crate) const fn from_root(root: Part) -> Self {
        Self { root }
    }

    /// Returns the top-level part, which carries the message headers.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Returns the message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Returns the top-level content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.root.content_type
    }

    /// Returns the top-level body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.root.body
    }

    /// Returns the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers().get_decoded("subject")
    }

    /// Returns the parsed From header.
    #[must_use]
    pub fn from(&self) -> Vec<Mailbox> {
        self.addresses("from")
    }

    /// Returns the parsed To header.
    #[must_use]
    pub fn to(&self) -> Vec<Mailbox> {
        self.addresses("to")
    }

    /// Returns the parsed Cc header.
    #[must_use]
    pub fn cc(&self) -> Vec<Mailbox> {
        self.addresses("cc")
    }

    /// Returns the parsed Bcc header.
    #[must_use]
    pub fn bcc(&self) -> Vec<Mailbox> {
        self.addresses("bcc")
    }

    /// Returns the parsed Reply-To header.
    #[must_use]
    pub fn reply_to(&self) -> Vec<Mailbox> {
        self.addresses("reply-to")
    }

    fn addresses(&self, name: &str) -> Vec<Mailbox> {
        self.headers()
            .get_all(name)
            .into_iter()
            .flat_map(parse_address_list)
            .collect()
    }

    /// Returns the Date header parsed as RFC 2822.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers()
            .get("date")
            .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
    }

    /// Returns the Message-ID without angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers()
            .get("message-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Returns the first `text/plain` body that is not an attachment.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        find_body(&self.root, &|body| match body {
            Body::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns the first `text/html` body that is not an attachment.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        find_body(&self.root, &|body| match body {
            Body::Html(html) => Some(html.as_str()),
            _ => None,
        })
    }

    /// Returns every attachment in tree order.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        extract_attachments(&self.root)
    }
}

fn find_body<'a>(part: &'a Part, select: &dyn Fn(&'a Body) -> Option<&'a str>) -> Option<&'a str> {
    match &part.body {
        Body::Multipart(children) => children.iter().find_map(|child| find_body(child, select)),
        body => {
            let is_body_type = part.content_type.is_text_plain() || part.content_type.is_text_html();
            if is_body_type && !crate::attachment::is_attachment(part) {
                select(body)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse(" quoted-printable "),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-unknown"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
    }

    #[test]
    fn test_message_accessors() {
        let raw = concat!(
            "From: \"Alice\" <alice@example.com>\r\n",
            "To: bob@example.com, carol@example.com\r\n",
            "Subject: =?utf-8?Q?Caf=C3=A9?=\r\n",
            "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
            "Message-ID: <abc@example.com>\r\n",
            "\r\n",
            "hi\r\n"
        );
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.subject().as_deref(), Some("Café"));
        assert_eq!(msg.from()[0].name.as_deref(), Some("Alice"));
        assert_eq!(msg.to().len(), 2);
        assert!(msg.cc().is_empty());
        assert_eq!(msg.message_id(), Some("abc@example.com"));
        assert_eq!(msg.date().unwrap().to_rfc2822(), "Tue, 1 Jul 2003 10:52:37 +0200");
        assert_eq!(msg.text_body(), Some("hi\r\n"));
        assert!(msg.html_body().is_none());
    }
}
