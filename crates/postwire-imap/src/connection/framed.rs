//! Framed I/O for IMAP protocol.
//!
//! Framing happens in two sans-I/O layers. [`LineFramer`] splits an
//! arbitrary byte stream into lines. [`ResponseFramer`] stitches lines and
//! `{n}` literal data back into complete responses. [`FramedStream`] drives
//! both from an async reader.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum literal size to prevent memory exhaustion.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Incremental splitter of a byte stream into LF-terminated lines.
///
/// Lines are returned without the `\n` and without one trailing `\r`. No
/// line length limit is applied here.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
    scanned: usize,
}

impl LineFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends inbound bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete line, or `None` if more data is needed.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let offset = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };
        let end = self.scanned + offset;
        let mut line = self.buffer.split_to(end + 1);
        self.scanned = 0;
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }
        Some(line.to_vec())
    }

    /// Removes exactly `n` raw bytes, or returns `None` if fewer are buffered.
    pub fn take_exact(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.buffer.len() < n {
            return None;
        }
        self.scanned = 0;
        Some(self.buffer.split_to(n).to_vec())
    }

    /// Flushes whatever is buffered as a final, unterminated line.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        self.scanned = 0;
        let mut rest = self.buffer.split();
        if rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        Some(rest.to_vec())
    }

    /// Number of bytes buffered but not yet returned.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.advance(self.buffer.len());
        self.scanned = 0;
    }
}

/// Assembles complete IMAP responses, splicing in `{n}` literal data.
///
/// A response whose line ends in `{n}` continues with exactly `n` raw bytes
/// and then the rest of the line. The assembled response keeps the CRLF
/// after each literal prefix so the decoder sees RFC 3501 syntax.
#[derive(Debug)]
pub struct ResponseFramer {
    lines: LineFramer,
    partial: Vec<u8>,
    literal: Option<usize>,
    max_literal: usize,
}

impl Default for ResponseFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseFramer {
    /// Creates a framer with the default literal cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_literal(MAX_LITERAL_SIZE)
    }

    /// Creates a framer that rejects literals larger than `max_literal`.
    #[must_use]
    pub fn with_max_literal(max_literal: usize) -> Self {
        Self {
            lines: LineFramer::new(),
            partial: Vec::new(),
            literal: None,
            max_literal,
        }
    }

    /// Appends inbound bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.lines.push(data);
    }

    /// Returns the next complete response, or `None` if more data is needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if a literal exceeds the size cap.
    pub fn next_response(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(size) = self.literal {
                let Some(data) = self.lines.take_exact(size) else {
                    return Ok(None);
                };
                self.partial.extend_from_slice(&data);
                self.literal = None;
                continue;
            }

            let Some(line) = self.lines.next_line() else {
                return Ok(None);
            };
            self.partial.extend_from_slice(&line);

            if let Some(size) = parse_literal_length(&line) {
                if size > self.max_literal {
                    self.partial.clear();
                    return Err(Error::Protocol(format!(
                        "literal too large: {size} bytes (max {})",
                        self.max_literal
                    )));
                }
                self.partial.extend_from_slice(b"\r\n");
                self.literal = Some(size);
                continue;
            }

            return Ok(Some(std::mem::take(&mut self.partial)));
        }
    }

    /// Flushes a trailing partial response at end of stream.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.literal.take().is_some() {
            let rest = self.lines.take_exact(self.lines.buffered()).unwrap_or_default();
            self.partial.extend_from_slice(&rest);
        } else if let Some(rest) = self.lines.finish() {
            self.partial.extend_from_slice(&rest);
        }
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }

    /// Number of bytes received but not yet returned.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.lines.buffered() + self.partial.len()
    }

    /// Drops all buffered state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.partial.clear();
        self.literal = None;
    }
}

/// Parses a literal length from the end of a line.
///
/// Matches lines ending in `{123}` or `{123+}` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Async reader producing complete IMAP responses.
pub struct FramedStream<S> {
    stream: S,
    framer: ResponseFramer,
    read_buffer: BytesMut,
    eof: bool,
}

impl<S> FramedStream<S> {
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self::from_parts(stream, ResponseFramer::new())
    }

    /// Creates a framed stream that continues with an existing framer.
    pub fn from_parts(stream: S, framer: ResponseFramer) -> Self {
        Self {
            stream,
            framer,
            read_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            eof: false,
        }
    }

    /// Splits into the stream and the framer holding any unread bytes.
    pub fn into_parts(self) -> (S, ResponseFramer) {
        (self.stream, self.framer)
    }
}

impl<S> FramedStream<S>
where
    S: AsyncRead + Unpin,
{
    /// Reads one complete response, literals included, with the final CRLF
    /// stripped. Returns `None` once the peer has closed the stream.
    ///
    /// # Errors
    ///
    /// Returns an error on socket failure or an oversized literal.
    pub async fn read_response(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(response) = self.framer.next_response()? {
                return Ok(Some(response));
            }
            if self.eof {
                return Ok(None);
            }
            self.read_buffer.clear();
            let n = self.stream.read_buf(&mut self.read_buffer).await?;
            if n == 0 {
                self.eof = true;
                return Ok(self.framer.finish());
            }
            self.framer.push(&self.read_buffer);
        }
    }
}

impl<S> FramedStream<S>
where
    S: AsyncWrite + Unpin,
{
    /// Writes a command to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
