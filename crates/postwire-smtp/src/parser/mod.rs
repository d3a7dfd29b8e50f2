//! SMTP reply decoder.
//!
//! Each reply line is `CODE SEP TEXT`, where `SEP` is `-` on every line of
//! a multi-line reply except the last, and a space (or nothing) on the
//! last:
//!
//! ```text
//! 250-smtp.example.com greets you
//! 250-SIZE 35882577
//! 250 AUTH LOGIN PLAIN
//! ```

use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One decoded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    /// Three-digit reply code.
    pub code: ReplyCode,
    /// True when another line of the same reply follows.
    pub continues: bool,
    /// Text after the separator.
    pub text: String,
}

/// Decodes one reply line. A trailing CRLF or LF is ignored.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the line does not start with three digits
/// or the fourth character is neither `-` nor a space.
pub fn parse_line(line: &str) -> Result<ReplyLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::Protocol(format!("Invalid reply line: {line:?}")));
    }
    let code = line[..3]
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {line:?}")))?;

    let continues = match bytes.get(3) {
        None | Some(b' ') => false,
        Some(b'-') => true,
        Some(_) => return Err(Error::Protocol(format!("Invalid reply separator: {line:?}"))),
    };
    let text = line.get(4..).unwrap_or_default().to_string();

    Ok(ReplyLine {
        code: ReplyCode::new(code),
        continues,
        text,
    })
}

/// Checks if a line is the last line of a reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&b'-')
}

/// Collects reply lines until the final one.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    code: Option<ReplyCode>,
    message: Vec<String>,
}

impl ReplyAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoded line. Returns the reply once its final line arrives,
    /// leaving the accumulator empty for the next one.
    pub fn push(&mut self, line: ReplyLine) -> Option<Reply> {
        let code = *self.code.get_or_insert(line.code);
        if code != line.code {
            warn!(expected = %code, got = %line.code, "reply code changed mid-reply");
        }
        self.message.push(line.text);
        if line.continues {
            return None;
        }
        self.code = None;
        Some(Reply::new(code, std::mem::take(&mut self.message)))
    }

    /// Returns true if part of a reply has been received.
    #[must_use]
    pub const fn in_progress(&self) -> bool {
        self.code.is_some()
    }
}

/// Parses a complete reply from its lines.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if a line is malformed, the block is empty,
/// the last line still continues, or lines follow the final one.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let mut accumulator = ReplyAccumulator::new();
    let mut lines = lines.iter();
    while let Some(line) = lines.next() {
        if let Some(reply) = accumulator.push(parse_line(line)?) {
            if lines.next().is_some() {
                return Err(Error::Protocol("Lines after final reply line".into()));
            }
            return Ok(reply);
        }
    }
    Err(Error::Protocol("Incomplete reply".into()))
}
