//! MIME message builder.

use crate::address::{Mailbox, format_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::message::TransferEncoding;
use chrono::Utc;

/// Longest line allowed in a 7bit body (RFC 5322).
const MAX_7BIT_LINE: usize = 998;

/// A file to attach to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// MIME type, `type/subtype`.
    pub content_type: String,
    /// Raw content.
    pub data: Vec<u8>,
    /// Content-ID for inline parts referenced as `cid:` from HTML.
    pub content_id: Option<String>,
}

impl OutgoingAttachment {
    /// Creates a regular attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
            content_id: None,
        }
    }

    /// Creates an inline part with a Content-ID.
    #[must_use]
    pub fn inline(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            content_id: Some(content_id.into()),
            ..Self::new(filename, content_type, data)
        }
    }

    /// Returns true if this part is displayed inline.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.content_id.is_some()
    }
}

/// Builder for RFC 5322 messages with MIME bodies.
///
/// The body layout is chosen from what was supplied:
/// attachments produce `multipart/mixed` (wrapping a nested
/// `multipart/alternative` when both text and HTML are set), text plus
/// HTML produce `multipart/alternative`, and a single body produces a
/// single-part message.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<OutgoingAttachment>,
    custom_headers: Vec<(String, String)>,
}

fn mailbox(address: &str) -> Mailbox {
    Mailbox::parse(address).unwrap_or_else(|| Mailbox::new(address))
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender, in `Name <addr>` or bare form.
    #[must_use]
    pub fn from(mut self, address: &str) -> Self {
        self.from = Some(mailbox(address));
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, address: &str) -> Self {
        self.to.push(mailbox(address));
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, address: &str) -> Self {
        self.cc.push(mailbox(address));
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, address: &str) -> Self {
        self.bcc.push(mailbox(address));
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: OutgoingAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds a custom header, emitted after the standard headers.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the sender address for the SMTP envelope.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.from.as_ref().map(|m| m.address.as_str())
    }

    /// Returns every To, Cc and Bcc address for the SMTP envelope.
    #[must_use]
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|m| m.address.as_str())
            .collect()
    }

    /// Builds the wire form of the message with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if no sender was set.
    pub fn build(&self) -> Result<Vec<u8>> {
        let from = self
            .from
            .as_ref()
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;
        let domain = from.domain().filter(|d| !d.is_empty()).unwrap_or("localhost");

        let mut out = String::new();
        push_header(&mut out, "From", &from.to_header_value());
        if !self.to.is_empty() {
            push_header(&mut out, "To", &format_address_list(&self.to));
        }
        if !self.cc.is_empty() {
            push_header(&mut out, "Cc", &format_address_list(&self.cc));
        }
        if !self.bcc.is_empty() {
            push_header(&mut out, "Bcc", &format_address_list(&self.bcc));
        }
        if let Some(subject) = &self.subject {
            push_header(&mut out, "Subject", &encode_rfc2047(subject, "utf-8"));
        }
        push_header(&mut out, "Date", &Utc::now().to_rfc2822());
        push_header(
            &mut out,
            "Message-ID",
            &format!("<{}@{domain}>", uuid::Uuid::new_v4()),
        );
        push_header(&mut out, "MIME-Version", "1.0");
        for (name, value) in &self.custom_headers {
            push_header(&mut out, name, &encode_rfc2047(value, "utf-8"));
        }

        self.write_body(&mut out);
        Ok(out.into_bytes())
    }

    fn write_body(&self, out: &mut String) {
        let has_both = self.text.is_some() && self.html.is_some();

        if !self.attachments.is_empty() {
            let boundary = new_boundary();
            push_header(out, "Content-Type", &ContentType::multipart_mixed(&boundary).to_string());
            out.push_str("\r\n");

            open_part(out, &boundary);
            if has_both {
                self.write_alternative(out);
            } else {
                self.write_single(out);
            }
            for attachment in &self.attachments {
                open_part(out, &boundary);
                write_attachment(out, attachment);
            }
            close_multipart(out, &boundary);
        } else if has_both {
            self.write_alternative(out);
        } else {
            self.write_single(out);
        }
    }

    fn write_alternative(&self, out: &mut String) {
        let boundary = new_boundary();
        push_header(
            out,
            "Content-Type",
            &ContentType::multipart_alternative(&boundary).to_string(),
        );
        out.push_str("\r\n");

        open_part(out, &boundary);
        write_text(out, &ContentType::text_plain(), self.text.as_deref().unwrap_or_default());
        open_part(out, &boundary);
        write_text(out, &ContentType::text_html(), self.html.as_deref().unwrap_or_default());
        close_multipart(out, &boundary);
    }

    fn write_single(&self, out: &mut String) {
        match (&self.text, &self.html) {
            (None, Some(html)) => write_text(out, &ContentType::text_html(), html),
            (text, _) => write_text(out, &ContentType::text_plain(), text.as_deref().unwrap_or_default()),
        }
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

fn new_boundary() -> String {
    format!("----=_Part_{}", uuid::Uuid::new_v4().simple())
}

/// Writes a delimiter line. The leading CRLF belongs to the delimiter, so
/// part content is never followed by an extra line break.
fn open_part(out: &mut String, boundary: &str) {
    out.push_str("\r\n--");
    out.push_str(boundary);
    out.push_str("\r\n");
}

fn close_multipart(out: &mut String, boundary: &str) {
    out.push_str("\r\n--");
    out.push_str(boundary);
    out.push_str("--\r\n");
}

/// Picks 7bit for short-lined ASCII with CRLF line endings, otherwise
/// quoted-printable.
fn text_encoding(text: &str) -> TransferEncoding {
    let clean_line_endings = text
        .split("\r\n")
        .all(|line| !line.contains(['\r', '\n']) && line.len() <= MAX_7BIT_LINE);
    if text.is_ascii() && clean_line_endings {
        TransferEncoding::SevenBit
    } else {
        TransferEncoding::QuotedPrintable
    }
}

fn write_text(out: &mut String, content_type: &ContentType, text: &str) {
    let encoding = text_encoding(text);
    push_header(out, "Content-Type", &content_type.to_string());
    push_header(out, "Content-Transfer-Encoding", &encoding.to_string());
    out.push_str("\r\n");
    match encoding {
        TransferEncoding::QuotedPrintable => out.push_str(&encode_quoted_printable(text)),
        _ => out.push_str(text),
    }
}

fn write_attachment(out: &mut String, attachment: &OutgoingAttachment) {
    let filename = encode_rfc2047(&attachment.filename, "utf-8");
    let content_type = ContentType::parse(&attachment.content_type)
        .unwrap_or_else(|_| ContentType::new("application", "octet-stream"))
        .with_parameter("name", filename.clone());
    push_header(out, "Content-Type", &content_type.to_string());
    push_header(out, "Content-Transfer-Encoding", "base64");

    match &attachment.content_id {
        Some(id) => {
            push_header(out, "Content-Disposition", &ContentDisposition::inline(filename).to_string());
            let id = id.trim_start_matches('<').trim_end_matches('>');
            push_header(out, "Content-ID", &format!("<{id}>"));
        }
        None => push_header(
            out,
            "Content-Disposition",
            &ContentDisposition::attachment(filename).to_string(),
        ),
    }

    out.push_str("\r\n");
    out.push_str(&encode_base64_wrapped(&attachment.data));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Message;

    fn build(builder: &MessageBuilder) -> String {
        String::from_utf8(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_requires_sender() {
        assert!(matches!(
            MessageBuilder::new().to("a@b.c").build(),
            Err(Error::MissingHeader(_))
        ));
    }

    #[test]
    fn test_standard_headers() {
        let raw = build(
            &MessageBuilder::new()
                .from("Alice <alice@example.com>")
                .to("bob@example.com")
                .cc("carol@example.com")
                .bcc("dave@example.com")
                .subject("Hello")
                .header("X-Mailer", "postwire")
                .text_body("Hi Bob"),
        );
        let headers_end = raw.find("\r\n\r\n").unwrap();
        let head = &raw[..headers_end];
        assert!(head.starts_with("From: Alice <alice@example.com>\r\n"));
        assert!(head.contains("To: bob@example.com\r\n"));
        assert!(head.contains("Cc: carol@example.com\r\n"));
        assert!(head.contains("Bcc: dave@example.com\r\n"));
        assert!(head.contains("Subject: Hello\r\n"));
        assert!(head.contains("MIME-Version: 1.0\r\n"));
        assert!(head.contains("X-Mailer: postwire\r\n"));
        assert!(head.contains("Content-Type: text/plain; charset=utf-8"));

        let msg = Message::parse(raw.as_bytes()).unwrap();
        let id = msg.message_id().unwrap();
        let (local, domain) = id.split_once('@').unwrap();
        assert_eq!(domain, "example.com");
        assert!(uuid::Uuid::parse_str(local).is_ok());
        assert!(msg.date().is_some());
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let raw = build(&MessageBuilder::new().from("a@b.c").subject("Grüße").text_body("x"));
        assert!(raw.contains("Subject: =?utf-8?B?"));
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.subject().as_deref(), Some("Grüße"));
    }

    #[test]
    fn test_html_only_is_single_part() {
        let raw = build(&MessageBuilder::new().from("a@b.c").html_body("<p>x</p>"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_no_body_is_empty_text() {
        let raw = build(&MessageBuilder::new().from("a@b.c"));
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.text_body(), Some(""));
    }

    #[test]
    fn test_boundaries_are_unique_per_level() {
        let raw = build(
            &MessageBuilder::new()
                .from("a@b.c")
                .text_body("t")
                .html_body("<p>h</p>")
                .attach(OutgoingAttachment::new("f.bin", "application/octet-stream", vec![1, 2, 3])),
        );
        let boundaries: Vec<_> = raw
            .match_indices("boundary=\"")
            .map(|(i, _)| {
                let rest = &raw[i + 10..];
                rest[..rest.find('"').unwrap()].to_string()
            })
            .collect();
        assert_eq!(boundaries.len(), 2);
        assert_ne!(boundaries[0], boundaries[1]);
        for boundary in &boundaries {
            let suffix = boundary.strip_prefix("----=_Part_").unwrap();
            assert_eq!(suffix.len(), 32);
            assert!(!suffix.contains('-'));
        }
    }

    #[test]
    fn test_attachment_base64_wrapped() {
        let raw = build(
            &MessageBuilder::new()
                .from("a@b.c")
                .text_body("see attached")
                .attach(OutgoingAttachment::new("big.bin", "application/octet-stream", vec![7u8; 1000])),
        );
        assert!(raw.contains("Content-Disposition: attachment; filename=big.bin\r\n"));
        let body_start = raw.find("Content-Transfer-Encoding: base64\r\n").unwrap();
        let encoded_lines: Vec<_> = raw[body_start..]
            .lines()
            .skip(3)
            .take_while(|l| !l.starts_with("--"))
            .collect();
        assert!(encoded_lines.len() > 1);
        assert!(encoded_lines.iter().all(|l| l.len() <= 76));
    }

    #[test]
    fn test_inline_part_headers() {
        let raw = build(
            &MessageBuilder::new()
                .from("a@b.c")
                .html_body("<img src=\"cid:logo\">")
                .attach(OutgoingAttachment::inline("logo.png", "image/png", vec![0x89, 0x50], "logo")),
        );
        assert!(raw.contains("Content-Disposition: inline; filename=logo.png\r\n"));
        assert!(raw.contains("Content-ID: <logo>\r\n"));
        assert!(raw.contains("Content-Type: image/png; name=logo.png\r\n"));
    }

    #[test]
    fn test_text_encoding_choice() {
        assert_eq!(text_encoding("plain\r\ntext"), TransferEncoding::SevenBit);
        assert_eq!(text_encoding("bare\nlf"), TransferEncoding::QuotedPrintable);
        assert_eq!(text_encoding("ünïcode"), TransferEncoding::QuotedPrintable);
        assert_eq!(text_encoding(&"x".repeat(1200)), TransferEncoding::QuotedPrintable);
    }

    #[test]
    fn test_envelope_addresses() {
        let builder = MessageBuilder::new()
            .from("Alice <alice@example.com>")
            .to("b@x.com")
            .cc("c@x.com")
            .bcc("d@x.com");
        assert_eq!(builder.sender(), Some("alice@example.com"));
        assert_eq!(builder.recipients(), vec!["b@x.com", "c@x.com", "d@x.com"]);
    }
}
