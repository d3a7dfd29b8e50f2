//! IMAP response decoding.
//!
//! Sans-I/O: the decoder takes one complete response (line plus any literal
//! data) and never touches the network.
//!
//! # Example
//!
//! ```
//! use postwire_imap::parser::{ParsedResponse, ResponseParser};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS");
//! assert_eq!(response, ParsedResponse::Exists(3));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{DecodeError, Lexer};
pub use response::{
    Address, Envelope, FetchData, ParsedResponse, ResponseCode, ResponseParser, Status,
    StatusText, TaggedResponse,
};
