//! RFC 5322 / MIME message parser.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Body, Message, Part, TransferEncoding};

/// Nesting limit for multipart recursion.
const MAX_DEPTH: usize = 32;

impl Message {
    /// Parses a raw message into a MIME tree.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart entity has no boundary or no
    /// delimiter lines, or if a base64 body cannot be decoded. The whole
    /// message is rejected in that case: one attachment with broken base64
    /// fails the parse even when every other part is readable.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        parse_part(raw, 0).map(Self::from_root)
    }
}

/// Splits an entity at the first empty line into header and body bytes.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[], &raw[1..]);
    }

    let mut pos = 0;
    while let Some(offset) = raw[pos..].iter().position(|&b| b == b'\n') {
        let next = pos + offset + 1;
        if raw[next..].starts_with(b"\r\n") {
            return (&raw[..next], &raw[next + 2..]);
        }
        if raw[next..].starts_with(b"\n") {
            return (&raw[..next], &raw[next + 1..]);
        }
        pos = next;
    }

    (raw, &[])
}

fn parse_part(raw: &[u8], depth: usize) -> Result<Part> {
    let (header_bytes, body) = split_header_body(raw);
    let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));

    let content_type = match headers.get("content-type") {
        Some(value) => ContentType::parse(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unparseable content type, assuming text/plain");
            ContentType::default()
        }),
        None => ContentType::default(),
    };

    if content_type.is_multipart() && depth < MAX_DEPTH {
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let children = split_multipart(body, boundary)?
            .into_iter()
            .filter(|section| !section.iter().all(u8::is_ascii_whitespace))
            .map(|section| parse_part(section, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Part {
            headers,
            content_type,
            body: Body::Multipart(children),
            data: Vec::new(),
        });
    }

    let encoding = headers
        .get("content-transfer-encoding")
        .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
    let data = decode_transfer(body, encoding)?;

    let charset = content_type.charset().unwrap_or("utf-8");
    let body = if content_type.is_text_html() {
        Body::Html(decode_charset(&data, charset))
    } else {
        if !content_type.is_text_plain() && !headers.contains("content-disposition") {
            tracing::warn!(
                content_type = %content_type.mime_type(),
                "unrecognized content type, treating as text"
            );
        }
        Body::Text(decode_charset(&data, charset))
    };

    Ok(Part {
        headers,
        content_type,
        body,
        data,
    })
}

fn decode_transfer(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(body)),
        TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(body)),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Ok(body.to_vec())
        }
    }
}

/// Splits a multipart body into the raw sections between delimiter lines.
///
/// The preamble and epilogue are discarded. The line break preceding each
/// delimiter belongs to the delimiter. A missing close delimiter is
/// tolerated and the last section runs to the end of the body.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut sections = Vec::new();
    let mut section_start: Option<usize> = None;
    let mut found = false;
    let mut pos = 0;

    loop {
        let line_end = body[pos..].iter().position(|&b| b == b'\n').map(|i| pos + i);
        let line = &body[pos..line_end.unwrap_or(body.len())];

        if let Some(rest) = line.strip_prefix(delimiter) {
            let is_close = rest.starts_with(b"--");
            if is_close || rest.iter().all(u8::is_ascii_whitespace) {
                if let Some(start) = section_start {
                    sections.push(&body[start..trim_line_break(body, start, pos)]);
                }
                found = true;
                if is_close {
                    return Ok(sections);
                }
                section_start = Some(line_end.map_or(body.len(), |end| end + 1));
            }
        }

        match line_end {
            Some(end) => pos = end + 1,
            None => break,
        }
    }

    if !found {
        return Err(Error::InvalidMultipart(format!(
            "no delimiter line for boundary {boundary:?}"
        )));
    }
    if let Some(start) = section_start {
        sections.push(&body[start..]);
    }
    Ok(sections)
}

/// Returns `end` moved back over one CRLF or LF, but never before `start`.
fn trim_line_break(body: &[u8], start: usize, mut end: usize) -> usize {
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_header_body() {
        let (h, b) = split_header_body(b"A: 1\r\nB: 2\r\n\r\nbody\r\n");
        assert_eq!(h, b"A: 1\r\nB: 2\r\n");
        assert_eq!(b, b"body\r\n");

        let (h, b) = split_header_body(b"A: 1\n\nbody");
        assert_eq!(h, b"A: 1\n");
        assert_eq!(b, b"body");

        let (h, b) = split_header_body(b"\r\nonly body");
        assert!(h.is_empty());
        assert_eq!(b, b"only body");

        let (h, b) = split_header_body(b"A: 1\r\n");
        assert_eq!(h, b"A: 1\r\n");
        assert!(b.is_empty());
    }

    #[test]
    fn test_parse_plain_text() {
        let msg = Message::parse(b"Subject: Hi\r\n\r\nHello, World!").unwrap();
        assert_eq!(msg.body(), &Body::Text("Hello, World!".to_string()));
        assert_eq!(msg.content_type().mime_type(), "text/plain");
    }

    #[test]
    fn test_parse_html_quoted_printable() {
        let raw = concat!(
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "<p>Gr=C3=BC=C3=9Fe, this line is long enough that it was wrapped with =\r\n",
            "a soft break</p>"
        );
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(
            msg.html_body(),
            Some("<p>Grüße, this line is long enough that it was wrapped with a soft break</p>")
        );
    }

    #[test]
    fn test_parse_base64_latin1() {
        let raw = concat!(
            "Content-Type: text/plain; charset=iso-8859-1\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "Y2Fm6Q==\r\n"
        );
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.text_body(), Some("café"));
    }

    #[test]
    fn test_parse_nested_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
            "\r\n",
            "This is the preamble.\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<b>html</b>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=a.bin\r\n",
            "\r\n",
            "xyz\r\n",
            "--outer--\r\n",
            "epilogue\r\n"
        );
        let msg = Message::parse(raw.as_bytes()).unwrap();
        let top = msg.root().children();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].children().len(), 2);
        assert_eq!(msg.text_body(), Some("plain"));
        assert_eq!(msg.html_body(), Some("<b>html</b>"));
        assert_eq!(msg.attachments()[0].data, b"xyz");
    }

    #[test]
    fn test_parse_lf_only_multipart() {
        let raw = "Content-Type: multipart/alternative; boundary=x\n\n--x\nContent-Type: text/plain\n\none\n--x--\n";
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.text_body(), Some("one"));
    }

    #[test]
    fn test_missing_close_delimiter() {
        let raw = "Content-Type: multipart/mixed; boundary=x\r\n\r\n--x\r\n\r\ntail";
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.root().children().len(), 1);
        assert_eq!(msg.text_body(), Some("tail"));
    }

    #[test]
    fn test_boundary_prefix_is_not_delimiter() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=ab\r\n\r\n",
            "--ab\r\n\r\n",
            "--abc is content\r\n",
            "--ab--\r\n"
        );
        let msg = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(msg.text_body(), Some("--abc is content"));
    }

    #[test]
    fn test_multipart_errors() {
        assert!(matches!(
            Message::parse(b"Content-Type: multipart/mixed\r\n\r\nbody"),
            Err(Error::MissingBoundary)
        ));
        assert!(matches!(
            Message::parse(b"Content-Type: multipart/mixed; boundary=z\r\n\r\nbody"),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_broken_attachment_rejects_message() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "readable\r\n",
            "--b\r\n",
            "Content-Type: application/pdf\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "@@@@\r\n",
            "--b--\r\n"
        );
        assert!(matches!(
            Message::parse(raw.as_bytes()),
            Err(Error::Base64Decode(_))
        ));
    }

    #[test]
    fn test_unknown_type_defaults_to_text() {
        let msg = Message::parse(b"Content-Type: application/x-thing\r\n\r\nabc").unwrap();
        assert_eq!(msg.body(), &Body::Text("abc".to_string()));
    }
}
