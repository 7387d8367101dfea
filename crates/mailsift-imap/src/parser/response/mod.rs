//! Response parser.
//!
//! Turns one framed response into a [`Response`]. Failures inside a FETCH
//! block are reported as [`Error::MalformedResponse`] carrying the message
//! number, so the caller can drop that message and keep reading.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use fetch::parse_envelope;
pub use types::{Address, Envelope, FetchItem, ResponseKind, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{parse_capability_data, parse_flag_list, parse_response_code, parse_search_data};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of a command.
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// Continuation request (`+`).
    Continuation {
        /// Optional text.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a complete response (line plus literals).
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer).map(Response::Untagged),
            Token::Plus => {
                if lexer.peek() == Some(b' ') {
                    lexer.advance();
                }
                let text = lexer.read_text_until_crlf();
                Ok(Response::Continuation {
                    text: (!text.is_empty()).then_some(text),
                })
            }
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(lexer.error(format!("expected '*', '+' or a tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;
        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
        lexer.expect_space()?;

        match lexer.next_token()? {
            Token::Atom(keyword) => match keyword.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Ok(UntaggedResponse::Ok { code, text })
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Ok(UntaggedResponse::No { code, text })
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Ok(UntaggedResponse::Bad { code, text })
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Ok(UntaggedResponse::PreAuth { code, text })
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Ok(UntaggedResponse::Bye { code, text })
                }
                "CAPABILITY" => Ok(UntaggedResponse::Capability(parse_capability_data(lexer)?)),
                "FLAGS" => {
                    lexer.expect_space()?;
                    Ok(UntaggedResponse::Flags(parse_flag_list(lexer)?))
                }
                "SEARCH" => Ok(UntaggedResponse::Search(parse_search_data(lexer)?)),
                _ => Ok(UntaggedResponse::Other(format!(
                    "{keyword}{}",
                    lexer.read_text_until_crlf()
                ))),
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom()?;
                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                    "RECENT" => Ok(UntaggedResponse::Recent(n)),
                    "EXPUNGE" => SeqNum::new(n)
                        .map(UntaggedResponse::Expunge)
                        .ok_or_else(|| lexer.error("EXPUNGE of message 0")),
                    "FETCH" => {
                        let seq = SeqNum::new(n).ok_or_else(|| lexer.error("FETCH of message 0"))?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_items(lexer)
                            .map_err(|e| Self::per_message(e, n))?;
                        Ok(UntaggedResponse::Fetch { seq, items })
                    }
                    _ => Ok(UntaggedResponse::Other(format!(
                        "{n} {keyword}{}",
                        lexer.read_text_until_crlf()
                    ))),
                }
            }
            token => Err(lexer.error(format!("unexpected token in untagged response: {token:?}"))),
        }
    }

    /// Pins a failure inside a FETCH block to its message.
    fn per_message(err: Error, seq: u32) -> Error {
        match err {
            Error::Parse { position, message } => Error::MalformedResponse {
                seq: Some(seq),
                reason: format!("{message} (at byte {position})"),
            },
            other => other.with_seq(seq),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(format!("invalid status: {s}"))),
        }
    }

    /// Parses `SP [code] text`; some servers omit the text entirely.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, lexer.read_text_until_crlf()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::types::{Capability, Flag};

    fn untagged(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn greeting() {
        assert_eq!(
            untagged(b"* OK IMAP4rev1 ready\r\n"),
            UntaggedResponse::Ok {
                code: None,
                text: "IMAP4rev1 ready".into()
            }
        );
    }

    #[test]
    fn tagged_no_with_code() {
        let response = ResponseParser::parse(b"A0002 NO [TRYCREATE] no such mailbox\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0002"),
                status: Status::No,
                code: Some(ResponseCode::TryCreate),
                text: "no such mailbox".into(),
            }
        );
    }

    #[test]
    fn tagged_ok_without_text() {
        let response = ResponseParser::parse(b"A0003 OK\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { status: Status::Ok, text, .. } if text.is_empty()));
    }

    #[test]
    fn capability_data() {
        assert_eq!(
            untagged(b"* CAPABILITY IMAP4rev1 IDLE UNSELECT AUTH=PLAIN\r\n"),
            UntaggedResponse::Capability(vec![
                Capability::Imap4Rev1,
                Capability::Idle,
                Capability::Unselect,
                Capability::Auth("PLAIN".into()),
            ])
        );
    }

    #[test]
    fn mailbox_counts() {
        assert_eq!(untagged(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
        assert_eq!(untagged(b"* 1 RECENT\r\n"), UntaggedResponse::Recent(1));
        assert_eq!(
            untagged(b"* 4 EXPUNGE\r\n"),
            UntaggedResponse::Expunge(SeqNum::new(4).unwrap())
        );
    }

    #[test]
    fn flags_data() {
        let UntaggedResponse::Flags(flags) = untagged(b"* FLAGS (\\Answered \\Seen)\r\n") else {
            panic!("expected FLAGS");
        };
        assert!(flags.contains(&Flag::Answered));
        assert!(flags.is_seen());
    }

    #[test]
    fn uidvalidity_code() {
        let UntaggedResponse::Ok { code, text } =
            untagged(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
        else {
            panic!("expected OK");
        };
        assert!(matches!(code, Some(ResponseCode::UidValidity(v)) if v.get() == 3857529045));
        assert_eq!(text, "UIDs valid");
    }

    #[test]
    fn continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ idling\r\n").unwrap(),
            Response::Continuation {
                text: Some("idling".into())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn search_results() {
        let UntaggedResponse::Search(nums) = untagged(b"* SEARCH 2 3 5 8\r\n") else {
            panic!("expected SEARCH");
        };
        let values: Vec<u32> = nums.iter().map(|s| s.get()).collect();
        assert_eq!(values, vec![2, 3, 5, 8]);
    }

    #[test]
    fn fetch_block() {
        let UntaggedResponse::Fetch { seq, items } =
            untagged(b"* 12 FETCH (FLAGS (\\Seen) RFC822.SIZE 4423)\r\n")
        else {
            panic!("expected FETCH");
        };
        assert_eq!(seq.get(), 12);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn malformed_fetch_names_the_message() {
        let err = ResponseParser::parse(b"* 5 FETCH (ENVELOPE (NIL \"s\"))\r\n").unwrap_err();
        match err {
            Error::MalformedResponse { seq, reason } => {
                assert_eq!(seq, Some(5));
                assert_eq!(reason, "ENVELOPE doesn't contain 10 fields");
            }
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn broken_fetch_syntax_is_per_message() {
        let err = ResponseParser::parse(b"* 6 FETCH (FLAGS \"oops\")\r\n").unwrap_err();
        assert!(err.is_per_message());
        assert!(matches!(err, Error::MalformedResponse { seq: Some(6), .. }));
    }

    #[test]
    fn unknown_data_is_kept() {
        assert_eq!(
            untagged(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n"),
            UntaggedResponse::Other("LIST (\\HasNoChildren) \"/\" INBOX".into())
        );
        assert_eq!(
            untagged(b"* 3 XFOO bar\r\n"),
            UntaggedResponse::Other("3 XFOO bar".into())
        );
    }
}
