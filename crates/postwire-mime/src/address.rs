//! Address header parsing and formatting.

use crate::encoding::{decode_rfc2047, encode_rfc2047};
use std::fmt;

/// A single mailbox from an address header such as `From` or `To`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name, RFC 2047 decoded.
    pub name: Option<String>,
    /// Address in `local@domain` form.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a mailbox with a display name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Returns the domain part of the address, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(_, d)| d)
    }

    /// Parses a single address in `Name <addr>` or bare `addr` form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let (Some(open), Some(close)) = (s.rfind('<'), s.rfind('>')) {
            if open < close {
                let address = s[open + 1..close].trim().to_string();
                let name = s[..open].trim().trim_matches('"').trim();
                let name = (!name.is_empty()).then(|| decode_rfc2047(&unescape(name)));
                return Some(Self { name, address });
            }
        }

        // Bare address, possibly followed by a comment: `addr (Name)`.
        let (address, comment) = match s.split_once('(') {
            Some((addr, rest)) => (addr.trim(), Some(rest.trim_end_matches(')').trim())),
            None => (s, None),
        };
        Some(Self {
            name: comment.filter(|c| !c.is_empty()).map(decode_rfc2047),
            address: address.to_string(),
        })
    }

    /// Formats the mailbox for a header, encoding the name when needed.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        match &self.name {
            Some(name) if !name.is_ascii() => {
                format!("{} <{}>", encode_rfc2047(name, "utf-8"), self.address)
            }
            Some(name) if name.contains(|c: char| ",;:<>@\"()[]\\.".contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\" <{}>", self.address)
            }
            Some(name) => format!("{name} <{}>", self.address),
            None => self.address.clone(),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
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

/// Parses a comma-separated address header value.
///
/// Commas inside quoted display names or angle brackets do not split.
/// Group syntax (`team: a@x, b@y;`) is flattened to its members.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<Mailbox> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                escaped = true;
                current.push(ch);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '<' if !in_quotes => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes => {
                in_angle = false;
                current.push(ch);
            }
            ':' if !in_quotes && !in_angle => current.clear(),
            ',' | ';' if !in_quotes && !in_angle => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    items.push(current);

    items.iter().filter_map(|item| Mailbox::parse(item)).collect()
}

/// Formats a list of mailboxes as a comma-separated header value.
#[must_use]
pub fn format_address_list(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(Mailbox::to_header_value)
        .collect::<Vec<_>>()
        .join(", ")
}
