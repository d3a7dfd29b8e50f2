//! Decoders shared by the untagged and tagged paths.

use crate::parser::lexer::{DecodeResult, Lexer};
use crate::types::{Flag, Folder};

use super::types::{ResponseCode, StatusText};

/// Parses the text that follows a status keyword.
///
/// The bracketed code is decoded when present but the text is kept whole.
pub fn parse_status_text(lexer: &mut Lexer<'_>) -> StatusText {
    lexer.skip_spaces();
    let start = lexer.remaining();
    let code = if lexer.peek() == Some(b'[') {
        parse_response_code(lexer).ok()
    } else {
        None
    };
    StatusText {
        code,
        text: String::from_utf8_lossy(start).into_owned(),
    }
}

/// Parses a response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> DecodeResult<ResponseCode> {
    lexer.expect(b'[')?;
    let atom = lexer.read_atom()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect(b' ')?;
            ResponseCode::UidNext(lexer.read_number()?)
        }
        "UIDVALIDITY" => {
            lexer.expect(b' ')?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect(b' ')?;
            ResponseCode::Unseen(lexer.read_number()?)
        }
        "PERMANENTFLAGS" => {
            lexer.expect(b' ')?;
            let flags = lexer.read_flag_list()?;
            ResponseCode::PermanentFlags(flags.iter().map(|f| Flag::parse(f)).collect())
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)),
        _ => {
            let start = lexer.position() - atom.len();
            while lexer.peek().is_some_and(|b| b != b']') {
                lexer.advance();
            }
            ResponseCode::Other(String::from_utf8_lossy(lexer.consumed_since(start)).into_owned())
        }
    };

    while lexer.peek().is_some_and(|b| b != b']') {
        lexer.advance();
    }
    lexer.expect(b']')?;
    Ok(code)
}

/// Parses space-separated capability atoms up to `]` or end of line.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Vec<String> {
    let mut caps = Vec::new();
    loop {
        lexer.skip_spaces();
        match lexer.peek() {
            None | Some(b']') => break,
            Some(_) => {
                let mut cap = Vec::new();
                while let Some(b) = lexer.peek().filter(|&b| b != b' ' && b != b']') {
                    cap.push(b);
                    lexer.advance();
                }
                caps.push(String::from_utf8_lossy(&cap).into_owned());
            }
        }
    }
    caps
}

/// Parses the body of a LIST response: `(attrs) "delim" name`.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> DecodeResult<Folder> {
    let attributes = lexer.read_flag_list()?;
    lexer.expect(b' ')?;
    let delimiter = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let name = lexer.read_astring()?;
    Ok(Folder {
        name,
        delimiter,
        attributes,
    })
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> DecodeResult<Vec<u32>> {
    let mut nums = Vec::new();
    loop {
        lexer.skip_spaces();
        if lexer.is_eof() {
            return Ok(nums);
        }
        // ESEARCH-style or MODSEQ trailers are not modelled.
        if lexer.peek() == Some(b'(') {
            lexer.skip_balanced()?;
            continue;
        }
        nums.push(lexer.read_number()?);
    }
}
