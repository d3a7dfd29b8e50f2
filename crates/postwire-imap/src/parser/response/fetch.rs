//! FETCH response decoding.

use tracing::debug;

use crate::parser::lexer::{DecodeResult, Lexer};
use crate::types::Flag;

use super::types::{Address, Envelope, FetchData};

/// Parses the parenthesized data item list of a FETCH response.
pub fn parse_fetch_data(lexer: &mut Lexer<'_>) -> DecodeResult<FetchData> {
    lexer.expect(b'(')?;
    let mut data = FetchData::default();

    loop {
        lexer.skip_spaces();
        match lexer.peek() {
            Some(b')') => {
                lexer.advance();
                return Ok(data);
            }
            None => return Err(lexer.error("unterminated FETCH data")),
            Some(_) => {}
        }

        let key = lexer.read_atom()?.to_ascii_uppercase();
        match key.as_str() {
            "UID" => {
                lexer.expect(b' ')?;
                data.uid = Some(lexer.read_number()?);
            }
            "RFC822.SIZE" => {
                lexer.expect(b' ')?;
                data.size = Some(lexer.read_number()?);
            }
            "FLAGS" => {
                lexer.expect(b' ')?;
                let flags = lexer.read_flag_list()?;
                data.flags = Some(flags.iter().map(|f| Flag::parse(f)).collect());
            }
            "INTERNALDATE" => {
                lexer.expect(b' ')?;
                data.internal_date = lexer.read_nstring()?;
            }
            "ENVELOPE" => {
                lexer.expect(b' ')?;
                data.envelope = Some(parse_envelope(lexer)?);
            }
            "BODYSTRUCTURE" => {
                lexer.expect(b' ')?;
                let span = lexer.skip_balanced()?;
                data.body_structure = Some(String::from_utf8_lossy(span).into_owned());
            }
            "BODY" | "BODY.PEEK" if lexer.peek() == Some(b'[') => {
                let section = read_section(lexer)?;
                lexer.expect(b' ')?;
                let bytes = lexer.read_nstring_bytes()?;
                store_section(&mut data, &section, bytes);
            }
            "BODY" => {
                lexer.expect(b' ')?;
                let span = lexer.skip_balanced()?;
                if data.body_structure.is_none() {
                    data.body_structure = Some(String::from_utf8_lossy(span).into_owned());
                }
            }
            "RFC822" => {
                lexer.expect(b' ')?;
                data.rfc822 = lexer.read_nstring_bytes()?;
            }
            "RFC822.HEADER" => {
                lexer.expect(b' ')?;
                data.header = lexer.read_nstring_bytes()?;
            }
            "RFC822.TEXT" => {
                lexer.expect(b' ')?;
                data.text = lexer.read_nstring_bytes()?;
            }
            _ => {
                debug!(item = %key, "skipping unmodelled FETCH item");
                lexer.skip_spaces();
                lexer.skip_item()?;
            }
        }
    }
}

/// Reads `[section]` and an optional `<origin>` after a BODY key.
fn read_section(lexer: &mut Lexer<'_>) -> DecodeResult<String> {
    lexer.expect(b'[')?;
    let mut section = Vec::new();
    let mut depth = 0usize;
    loop {
        match lexer.advance() {
            Some(b']') if depth == 0 => break,
            Some(b) => {
                match b {
                    b'(' => depth += 1,
                    b')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                section.push(b);
            }
            None => return Err(lexer.error("unterminated section")),
        }
    }
    if lexer.eat(b'<') {
        lexer.read_number()?;
        lexer.expect(b'>')?;
    }
    Ok(String::from_utf8_lossy(&section).to_ascii_uppercase())
}

fn store_section(data: &mut FetchData, section: &str, bytes: Option<Vec<u8>>) {
    if section.is_empty() {
        data.rfc822 = bytes;
    } else if section.starts_with("HEADER") {
        data.header = bytes;
    } else if section == "TEXT" {
        data.text = bytes;
    } else {
        debug!(section, "ignoring body section");
    }
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> DecodeResult<Envelope> {
    lexer.expect(b'(')?;

    let date = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let subject = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let from = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let sender = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let to = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let cc = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect(b' ')?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let message_id = lexer.read_nstring()?;

    lexer.skip_spaces();
    lexer.expect(b')')?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses an address list; `NIL` yields an empty list.
fn parse_address_list(lexer: &mut Lexer<'_>) -> DecodeResult<Vec<Address>> {
    if lexer.eat_nil() {
        return Ok(Vec::new());
    }
    lexer.expect(b'(')?;
    let mut addresses = Vec::new();
    loop {
        lexer.skip_spaces();
        if lexer.eat(b')') {
            return Ok(addresses);
        }
        addresses.push(parse_address(lexer)?);
    }
}

/// Parses `(name route mailbox host)`. The route is discarded.
fn parse_address(lexer: &mut Lexer<'_>) -> DecodeResult<Address> {
    lexer.expect(b'(')?;
    let name = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let _route = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect(b' ')?;
    let host = lexer.read_nstring()?;
    lexer.expect(b')')?;
    Ok(Address {
        name,
        mailbox,
        host,
    })
}
