//! Response parser.
//!
//! Sans-I/O: the [`Lexer`] tokenizes one framed response and the
//! [`ResponseParser`] builds a typed [`Response`] from it.
//!
//! ```
//! use mailsift_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(3)));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, MAX_LITERAL_SIZE, Token};
pub use response::{
    Address, Envelope, FetchItem, Response, ResponseKind, ResponseParser, UntaggedResponse,
    parse_envelope,
};
