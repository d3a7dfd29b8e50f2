//! MIME content type and content disposition handling.

use crate::encoding::decode_rfc2231;
use crate::error::{Error, Result};
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lowercased.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lowercased.
    pub sub_type: String,
    /// Parameters in declaration order, names lowercased.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type with UTF-8 charset.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type with UTF-8 charset.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        if let Some(entry) = self.parameters.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.parameters.push((key, value));
        }
        self
    }

    /// Returns a parameter value by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        find_parameter(&self.parameters, key)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns the `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameter("name")
    }

    /// Returns the `type/subtype` string without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Checks if this is `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.is_text() && self.sub_type == "plain"
    }

    /// Checks if this is `text/html`.
    #[must_use]
    pub fn is_text_html(&self) -> bool {
        self.is_text() && self.sub_type == "html"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();
        let type_str = segments.next().unwrap_or_default();

        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(m, s)| (m.trim(), s.trim()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(s.trim().to_string()))?;

        Ok(Self {
            main_type: main_type.to_ascii_lowercase(),
            sub_type: sub_type.to_ascii_lowercase(),
            parameters: parse_parameters(segments),
        })
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        write_parameters(f, &self.parameters)
    }
}

/// Disposition type from a `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed inline with the message body.
    Inline,
    /// Separate attachment.
    Attachment,
    /// Any other token.
    Other(String),
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters in declaration order, names lowercased.
    pub parameters: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Creates an inline disposition with a filename.
    #[must_use]
    pub fn inline(filename: impl Into<String>) -> Self {
        Self {
            kind: DispositionKind::Inline,
            parameters: vec![("filename".to_string(), filename.into())],
        }
    }

    /// Creates an attachment disposition with a filename.
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self {
            kind: DispositionKind::Attachment,
            parameters: vec![("filename".to_string(), filename.into())],
        }
    }

    /// Parses a `Content-Disposition` value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut segments = split_parameters(s).into_iter();
        let kind = match segments.next().unwrap_or_default().to_ascii_lowercase().as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            other => DispositionKind::Other(other.to_string()),
        };
        Self {
            kind,
            parameters: parse_parameters(segments),
        }
    }

    /// Returns the filename parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        find_parameter(&self.parameters, "filename")
    }

    /// Returns true for `inline` or `attachment` dispositions.
    #[must_use]
    pub const fn is_attachment_like(&self) -> bool {
        matches!(
            self.kind,
            DispositionKind::Inline | DispositionKind::Attachment
        )
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DispositionKind::Inline => f.write_str("inline")?,
            DispositionKind::Attachment => f.write_str("attachment")?,
            DispositionKind::Other(other) => f.write_str(other)?,
        }
        write_parameters(f, &self.parameters)
    }
}

fn find_parameter<'a>(parameters: &'a [(String, String)], key: &str) -> Option<&'a str> {
    parameters
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn write_parameters(f: &mut fmt::Formatter<'_>, parameters: &[(String, String)]) -> fmt::Result {
    for (key, value) in parameters {
        if value.is_empty()
            || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
        {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "; {key}=\"{escaped}\"")?;
        } else {
            write!(f, "; {key}={value}")?;
        }
    }
    Ok(())
}

/// Splits a header value on `;`, ignoring separators inside quoted strings.
fn split_parameters(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => {
                segments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    segments.push(current.trim().to_string());
    segments
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parses `key=value` segments, folding RFC 2231 extended and continued
/// parameters (`name*=`, `name*0=`, `name*1*=`) into a single decoded value.
fn parse_parameters(segments: impl Iterator<Item = String>) -> Vec<(String, String)> {
    struct Continued {
        name: String,
        pieces: Vec<(u32, bool, String)>,
    }

    let mut parameters: Vec<(String, String)> = Vec::new();
    let mut continued: Vec<Continued> = Vec::new();

    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value);

        let Some((base, rest)) = key.split_once('*') else {
            parameters.push((key, value));
            continue;
        };

        if rest.is_empty() {
            parameters.push((base.to_string(), decode_rfc2231(&value)));
            continue;
        }

        let extended = rest.ends_with('*');
        let Ok(index) = rest.trim_end_matches('*').parse::<u32>() else {
            continue;
        };
        match continued.iter_mut().find(|c| c.name == base) {
            Some(entry) => entry.pieces.push((index, extended, value)),
            None => continued.push(Continued {
                name: base.to_string(),
                pieces: vec![(index, extended, value)],
            }),
        }
    }

    for mut entry in continued {
        entry.pieces.sort_by_key(|(index, _, _)| *index);
        let any_extended = entry.pieces.iter().any(|(_, extended, _)| *extended);
        let joined: String = entry.pieces.into_iter().map(|(_, _, v)| v).collect();
        let value = if any_extended {
            decode_rfc2231(&joined)
        } else {
            joined
        };
        // Extended values take precedence over a plain fallback parameter.
        parameters.retain(|(k, _)| *k != entry.name);
        parameters.push((entry.name, value));
    }

    parameters
}
