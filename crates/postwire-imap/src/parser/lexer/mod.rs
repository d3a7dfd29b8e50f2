//! Byte scanner for IMAP response grammar.
//!
//! The scanner walks one complete response, including any literal data the
//! framer has already spliced in after a `{n}` prefix. Every primitive either
//! consumes exactly the item it names or returns a [`DecodeError`] carrying
//! the offset where decoding stopped.

use thiserror::Error;

/// Error raised while decoding a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode error at byte {position}: {message}")]
pub struct DecodeError {
    /// Byte offset into the response.
    pub position: usize,
    /// What went wrong.
    pub message: String,
}

/// Result type for scanner primitives.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// IMAP response scanner.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new scanner for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns the bytes consumed since `start`.
    #[must_use]
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.input[start.min(self.pos)..self.pos]
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Consumes `expected` or fails.
    pub fn expect(&mut self, expected: u8) -> DecodeResult<()> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(&format!(
                "expected {:?}, found {:?}",
                char::from(expected),
                char::from(b)
            ))),
            None => Err(self.error(&format!("expected {:?}, found end", char::from(expected)))),
        }
    }

    /// Consumes `expected` if it is the next byte.
    pub fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reads a run of atom characters.
    pub fn read_atom(&mut self) -> DecodeResult<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected atom"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in atom"))
    }

    /// Reads everything up to the next space (or end of input).
    pub fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b' ') {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default()
    }

    /// Reads an unsigned decimal number.
    pub fn read_number(&mut self) -> DecodeResult<u32> {
        let n = self.read_number_u64()?;
        u32::try_from(n).map_err(|_| self.error("number out of range"))
    }

    /// Reads an unsigned decimal number up to 64 bits.
    pub fn read_number_u64(&mut self) -> DecodeResult<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or_else(|| self.error("number too large"))?;
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected number"));
        }
        Ok(value)
    }

    /// Reads a quoted string, resolving backslash escapes.
    pub fn read_quoted(&mut self) -> DecodeResult<String> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated quoted string")),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Reads a `{n}` or `{n+}` literal and returns its data.
    pub fn read_literal(&mut self) -> DecodeResult<&'a [u8]> {
        self.expect(b'{')?;
        let size = usize::try_from(self.read_number_u64()?)
            .map_err(|_| self.error("literal too large"))?;
        self.eat(b'+');
        self.expect(b'}')?;
        self.eat(b'\r');
        self.expect(b'\n')?;
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal data"))?;
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(data)
    }

    /// Reads a string (quoted or literal) as raw bytes.
    pub fn read_string_bytes(&mut self) -> DecodeResult<Vec<u8>> {
        match self.peek() {
            Some(b'"') => self.read_quoted().map(String::into_bytes),
            Some(b'{') => self.read_literal().map(<[u8]>::to_vec),
            _ => Err(self.error("expected string")),
        }
    }

    /// Reads an nstring (`NIL`, quoted or literal) as raw bytes.
    pub fn read_nstring_bytes(&mut self) -> DecodeResult<Option<Vec<u8>>> {
        if self.eat_nil() {
            return Ok(None);
        }
        self.read_string_bytes().map(Some)
    }

    /// Reads an nstring as text; `NIL` becomes `None`.
    pub fn read_nstring(&mut self) -> DecodeResult<Option<String>> {
        Ok(self
            .read_nstring_bytes()?
            .map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Reads an astring (atom, quoted or literal).
    pub fn read_astring(&mut self) -> DecodeResult<String> {
        match self.peek() {
            Some(b'"' | b'{') => self
                .read_string_bytes()
                .map(|b| String::from_utf8_lossy(&b).into_owned()),
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|b| is_atom_char(b) || b == b']') {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.error("expected astring"));
                }
                Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
        }
    }

    /// Consumes `NIL` (any case) if present.
    pub fn eat_nil(&mut self) -> bool {
        let rest = self.remaining();
        let is_nil = rest.len() >= 3
            && rest[..3].eq_ignore_ascii_case(b"NIL")
            && rest.get(3).is_none_or(|&b| !is_atom_char(b));
        if is_nil {
            self.pos += 3;
        }
        is_nil
    }

    /// Reads a parenthesized, space-separated flag list such as `(\Seen \*)`.
    pub fn read_flag_list(&mut self) -> DecodeResult<Vec<String>> {
        self.expect(b'(')?;
        let mut flags = Vec::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(flags);
                }
                Some(_) => {
                    let start = self.pos;
                    while self.peek().is_some_and(|b| b != b' ' && b != b')') {
                        self.pos += 1;
                    }
                    flags.push(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned());
                }
                None => return Err(self.error("unterminated flag list")),
            }
        }
    }

    /// Skips a balanced parenthesized group and returns its span, parens included.
    ///
    /// Parentheses inside quoted strings and literal data are not structure.
    pub fn skip_balanced(&mut self) -> DecodeResult<&'a [u8]> {
        let start = self.pos;
        self.expect(b'(')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Some(b'(') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b')') => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(b'"') => {
                    self.read_quoted()?;
                }
                Some(b'{') => {
                    self.read_literal()?;
                }
                Some(_) => self.pos += 1,
                None => return Err(self.error("unbalanced parentheses")),
            }
        }
        Ok(&self.input[start..self.pos])
    }

    /// Skips a single value of unknown shape: a group, string, literal or bare token.
    pub fn skip_item(&mut self) -> DecodeResult<()> {
        match self.peek() {
            Some(b'(') => self.skip_balanced().map(drop),
            Some(b'"') => self.read_quoted().map(drop),
            Some(b'{') => self.read_literal().map(drop),
            Some(_) => {
                while self.peek().is_some_and(|b| b != b' ' && b != b')') {
                    self.pos += 1;
                }
                Ok(())
            }
            None => Err(self.error("expected value")),
        }
    }

    /// Reads the rest of the input as text.
    pub fn read_rest(&mut self) -> String {
        let rest = String::from_utf8_lossy(self.remaining()).into_owned();
        self.pos = self.input.len();
        rest
    }

    /// Creates a decode error at the current position.
    #[must_use]
    pub fn error(&self, message: &str) -> DecodeError {
        DecodeError {
            position: self.pos,
            message: message.to_string(),
        }
    }
}

/// Returns true if the byte is a valid atom character.
///
/// `\` is accepted so that flags such as `\Seen` scan as one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 |
        0x23..=0x24 |
        0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}
