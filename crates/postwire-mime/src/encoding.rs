//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header encoding and
//! RFC 2231 parameter values.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use std::fmt::Write as _;

/// Maximum encoded line length for Base64 and Quoted-Printable bodies.
pub const MAX_LINE_LENGTH: usize = 76;

/// Bytes of input per RFC 2047 encoded word (60 base64 characters).
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, wrapped at 76 characters with CRLF line breaks.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);
    // Base64 output is pure ASCII, so byte chunks are valid char boundaries.
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.extend(chunk.iter().map(|&b| char::from(b)));
    }
    result
}

/// Decodes Base64 data, ignoring embedded line breaks and whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match STANDARD.decode(&cleaned) {
        Ok(bytes) => Ok(bytes),
        // Some senders drop the trailing padding.
        Err(_) => STANDARD_NO_PAD
            .decode(cleaned.trim_end_matches('='))
            .map_err(Into::into),
    }
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// CRLF pairs are emitted as hard line breaks. Bare CR or LF bytes are
/// escaped so that decoding restores the input exactly.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();
    let mut line_length = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];

        if byte == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            // Trailing whitespace before a hard break must be encoded.
            if result.ends_with(' ') || result.ends_with('\t') {
                if let Some(ws) = result.pop() {
                    let _ = write!(result, "={:02X}", u32::from(ws));
                }
            }
            result.push_str("\r\n");
            line_length = 0;
            i += 2;
            continue;
        }

        let width = match byte {
            b'!'..=b'<' | b'>'..=b'~' | b' ' | b'\t' => 1,
            _ => 3,
        };
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if width == 1 {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    if result.ends_with(' ') || result.ends_with('\t') {
        if let Some(ws) = result.pop() {
            let _ = write!(result, "={:02X}", u32::from(ws));
        }
    }

    result
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks (`=` followed by a line ending) are removed. Malformed
/// escape sequences are passed through literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break, allowing transport padding before the line ending.
        let mut j = i + 1;
        while j < data.len() && (data[j] == b' ' || data[j] == b'\t') {
            j += 1;
        }
        if data.get(j) == Some(&b'\n') {
            i = j + 1;
            continue;
        }
        if data.get(j) == Some(&b'\r') && data.get(j + 1) == Some(&b'\n') {
            i = j + 2;
            continue;
        }
        if j == data.len() {
            i = j;
            continue;
        }

        match (
            data.get(i + 1).and_then(|&b| hex_value(b)),
            data.get(i + 2).and_then(|&b| hex_value(b)),
        ) {
            (Some(high), Some(low)) => {
                result.push(high << 4 | low);
                i += 3;
            }
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Encodes a header value using RFC 2047 `B` encoding if it contains
/// non-ASCII characters.
///
/// Long values are split into several encoded words on character
/// boundaries and folded onto continuation lines.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    words.join("\r\n ")
}

/// Decodes every RFC 2047 encoded word found in a header value.
///
/// Whitespace between adjacent encoded words is dropped. Words with an
/// unknown encoding or undecodable payload are left untouched.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_ws = String::new();
    let mut last_was_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = decode_encoded_word(rest) {
            if !last_was_word {
                result.push_str(&pending_ws);
            }
            pending_ws.clear();
            result.push_str(&decoded);
            rest = &rest[consumed..];
            last_was_word = true;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch == ' ' || ch == '\t' {
            pending_ws.push(ch);
        } else {
            result.push_str(&pending_ws);
            pending_ws.clear();
            result.push(ch);
            last_was_word = false;
        }
        rest = &rest[ch.len_utf8()..];
    }

    result.push_str(&pending_ws);
    result
}

/// Attempts to decode one `=?charset?enc?text?=` word at the start of `s`.
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_encoded_word(s: &str) -> Option<(String, usize)> {
    let body = s.strip_prefix("=?")?;
    let (charset, after_charset) = body.split_once('?')?;
    let (encoding, after_encoding) = after_charset.split_once('?')?;
    let end = after_encoding.find("?=")?;
    let payload = &after_encoding[..end];
    if charset.is_empty() || payload.contains(char::is_whitespace) {
        return None;
    }
    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;

    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    Some((decode_charset(&bytes, charset), consumed))
}

/// Converts bytes in the named charset to a string.
///
/// UTF-8 and ASCII are decoded directly and Latin-1 variants map bytes to
/// code points. Other charsets fall back to lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    match charset.trim().to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" | "latin-1" | "iso8859-1" | "windows-1252" | "cp1252" => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'%XX...`).
///
/// Values without the charset/language prefix are percent-decoded as UTF-8.
#[must_use]
pub fn decode_rfc2231(value: &str) -> String {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_lang), Some(encoded)) => {
            let charset = if charset.is_empty() { "utf-8" } else { charset };
            decode_charset(&percent_decode(encoded), charset)
        }
        _ => String::from_utf8_lossy(&percent_decode(value)).into_owned(),
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(high), Some(low)) = (
                bytes.get(i + 1).and_then(|&b| hex_value(b)),
                bytes.get(i + 2).and_then(|&b| hex_value(b)),
            ) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_line_length() {
        let data = vec![0xAB_u8; 300];
        let encoded = encode_base64_wrapped(&data);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64_missing_padding() {
        assert_eq!(decode_base64("SGk").unwrap(), b"Hi");
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
        let encoded = encode_quoted_printable("Héllo, Wørld!");
        assert!(encoded.contains("=C3=A9"));
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_encode_line_breaks() {
        assert_eq!(encode_quoted_printable("one\r\ntwo"), "one\r\ntwo");
        assert_eq!(encode_quoted_printable("one\ntwo"), "one=0Atwo");
        assert_eq!(encode_quoted_printable("end \r\nx"), "end=20\r\nx");
    }

    #[test]
    fn test_quoted_printable_soft_wrap() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        assert!(encoded.split("\r\n").all(|l| l.len() <= MAX_LINE_LENGTH));
        assert_eq!(decode_quoted_printable(encoded.as_bytes()), text.as_bytes());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello= \r\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_malformed_escape_is_literal() {
        assert_eq!(decode_quoted_printable(b"a=zz"), b"a=zz");
        assert_eq!(decode_quoted_printable(b"x = 5"), b"x = 5");
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");

        let encoded = encode_rfc2047("Héllo", "utf-8");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(decode_rfc2047(&encoded), "Héllo");
    }

    #[test]
    fn test_rfc2047_encode_long_value_splits_words() {
        let subject = "Übersicht ".repeat(12);
        let encoded = encode_rfc2047(&subject, "utf-8");
        assert!(encoded.contains("\r\n "));
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= 75);
        }
        // Folding whitespace is unfolded to a single space by the header parser.
        assert_eq!(decode_rfc2047(&encoded.replace("\r\n ", " ")), subject);
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?="), "Héllo there");
    }

    #[test]
    fn test_rfc2047_decode_in_place() {
        assert_eq!(
            decode_rfc2047("Re: =?ISO-8859-1?Q?caf=E9?= tonight"),
            "Re: café tonight"
        );
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?a?= =?utf-8?Q?b?="),
            "ab"
        );
    }

    #[test]
    fn test_rfc2047_unknown_encoding_untouched() {
        assert_eq!(decode_rfc2047("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
        assert_eq!(decode_rfc2047("a =? b"), "a =? b");
    }

    #[test]
    fn test_rfc2231_decode() {
        assert_eq!(decode_rfc2231("utf-8''na%C3%AFve.txt"), "naïve.txt");
        assert_eq!(decode_rfc2231("iso-8859-1'en'caf%E9.pdf"), "café.pdf");
        assert_eq!(decode_rfc2231("plain.txt"), "plain.txt");
    }

    proptest! {
        #[test]
        fn qp_decode_is_identity_on_plain_ascii(s in "[a-zA-Z0-9 .,;:!?()-]{0,200}") {
            prop_assert_eq!(decode_quoted_printable(s.as_bytes()), s.as_bytes());
        }

        #[test]
        fn qp_round_trip(s in "\\PC{0,300}") {
            let encoded = encode_quoted_printable(&s);
            prop_assert_eq!(decode_quoted_printable(encoded.as_bytes()), s.as_bytes());
        }

        #[test]
        fn base64_wrapped_round_trip(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_base64_wrapped(&data);
            prop_assert_eq!(decode_base64(&encoded).unwrap(), data);
        }
    }
}
