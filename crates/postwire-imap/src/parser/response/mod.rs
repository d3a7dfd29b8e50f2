//! IMAP response decoder.
//!
//! Every input yields a [`ParsedResponse`]. Lines that do not match the
//! grammar decode to [`ParsedResponse::Unknown`] with a warning so one odd
//! extension cannot take down an otherwise healthy session.

mod fetch;
mod helpers;
mod types;

pub use types::{
    Address, Envelope, FetchData, ParsedResponse, ResponseCode, Status, StatusText,
    TaggedResponse,
};

use tracing::warn;

use crate::parser::lexer::{DecodeResult, Lexer};
use crate::types::Flag;

use helpers::{parse_capability_data, parse_list_response, parse_search_response, parse_status_text};

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Decodes one complete response (CRLF already stripped).
    #[must_use]
    pub fn parse(input: &[u8]) -> ParsedResponse {
        match Self::try_parse(input) {
            Ok(response) => response,
            Err(err) => {
                let raw = String::from_utf8_lossy(input).into_owned();
                warn!(error = %err, line = %raw, "undecodable IMAP response");
                ParsedResponse::Unknown(raw)
            }
        }
    }

    fn try_parse(input: &[u8]) -> DecodeResult<ParsedResponse> {
        let mut lexer = Lexer::new(input);
        match lexer.peek() {
            Some(b'*') => {
                lexer.advance();
                lexer.expect(b' ')?;
                Self::parse_untagged(&mut lexer, input)
            }
            Some(b'+') => {
                lexer.advance();
                lexer.eat(b' ');
                Ok(ParsedResponse::Continuation(lexer.read_rest()))
            }
            Some(_) => Self::parse_tagged(&mut lexer),
            None => Err(lexer.error("empty response")),
        }
    }

    /// Parses `TAG STATUS message`.
    fn parse_tagged(lexer: &mut Lexer<'_>) -> DecodeResult<ParsedResponse> {
        let tag = lexer.read_atom()?.to_string();
        lexer.expect(b' ')?;
        let status = match lexer.read_atom()?.to_ascii_uppercase().as_str() {
            "OK" => Status::Ok,
            "NO" => Status::No,
            "BAD" => Status::Bad,
            other => return Err(lexer.error(&format!("unknown status {other}"))),
        };
        let text = if lexer.eat(b' ') {
            parse_status_text(lexer)
        } else {
            StatusText {
                code: None,
                text: String::new(),
            }
        };
        Ok(ParsedResponse::Tagged(TaggedResponse {
            tag,
            status,
            code: text.code,
            message: text.text,
        }))
    }

    /// Parses the part of an untagged response after `* `.
    fn parse_untagged(lexer: &mut Lexer<'_>, input: &[u8]) -> DecodeResult<ParsedResponse> {
        if lexer.peek().is_some_and(|b| b.is_ascii_digit()) {
            return Self::parse_message_data(lexer, input);
        }

        let keyword = lexer.read_atom()?.to_ascii_uppercase();
        let response = match keyword.as_str() {
            "OK" => ParsedResponse::Greeting(parse_status_text(lexer)),
            "PREAUTH" => ParsedResponse::PreAuth(parse_status_text(lexer)),
            "BYE" => ParsedResponse::Bye(parse_status_text(lexer).text),
            "CAPABILITY" => ParsedResponse::Capability(parse_capability_data(lexer)),
            "FLAGS" => {
                lexer.expect(b' ')?;
                let flags = lexer.read_flag_list()?;
                ParsedResponse::Flags(flags.iter().map(|f| Flag::parse(f)).collect())
            }
            "LIST" | "LSUB" => {
                lexer.expect(b' ')?;
                ParsedResponse::List(parse_list_response(lexer)?)
            }
            "SEARCH" => ParsedResponse::Search(parse_search_response(lexer)?),
            _ => ParsedResponse::Untagged(raw_text(input)),
        };
        Ok(response)
    }

    /// Parses `<n> EXISTS`, `<n> RECENT`, `<n> EXPUNGE` and `<n> FETCH (...)`.
    fn parse_message_data(lexer: &mut Lexer<'_>, input: &[u8]) -> DecodeResult<ParsedResponse> {
        let n = lexer.read_number()?;
        lexer.expect(b' ')?;
        let keyword = lexer.read_atom()?.to_ascii_uppercase();
        let response = match keyword.as_str() {
            "EXISTS" => ParsedResponse::Exists(n),
            "RECENT" => ParsedResponse::Recent(n),
            "EXPUNGE" => ParsedResponse::Expunge(n),
            "FETCH" => {
                lexer.expect(b' ')?;
                ParsedResponse::Fetch(n, Box::new(fetch::parse_fetch_data(lexer)?))
            }
            _ => ParsedResponse::Untagged(raw_text(input)),
        };
        Ok(response)
    }
}

fn raw_text(input: &[u8]) -> String {
    String::from_utf8_lossy(input).into_owned()
}
