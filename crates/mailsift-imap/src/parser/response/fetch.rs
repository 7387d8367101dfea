//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::{Error, Result};

use super::helpers::parse_flag_list;
use super::types::{Address, Envelope, FetchItem};

const SHORT_ENVELOPE: &str = "ENVELOPE doesn't contain 10 fields";

/// Parses the parenthesised item list of a FETCH response.
pub fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(format!("expected fetch item, got {token:?}"))),
        };

        match name.to_ascii_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| Error::malformed("UID 0"))?;
                items.push(FetchItem::Uid(uid));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                if let Some(date) = lexer.read_nstring()? {
                    items.push(FetchItem::InternalDate(date));
                }
            }
            "ENVELOPE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
            }
            "RFC822" => items.push(section_item(lexer, String::new(), None)?),
            "RFC822.HEADER" => items.push(section_item(lexer, "HEADER".into(), None)?),
            "RFC822.TEXT" => items.push(section_item(lexer, "TEXT".into(), None)?),
            "BODY" if lexer.peek() == Some(b'[') => {
                let (section, origin) = parse_section_spec(lexer)?;
                items.push(section_item(lexer, section, origin)?);
            }
            _ => {
                // BODYSTRUCTURE, MODSEQ, vendor items, ...
                if lexer.peek() == Some(b'[') {
                    parse_section_spec(lexer)?;
                }
                lexer.expect_space()?;
                lexer.skip_value()?;
            }
        }
    }

    Ok(items)
}

fn section_item(lexer: &mut Lexer<'_>, name: String, origin: Option<u32>) -> Result<FetchItem> {
    lexer.expect_space()?;
    let data = match lexer.next_token()? {
        Token::Literal(bytes) => Some(bytes.to_vec()),
        Token::QuotedString(s) => Some(s.into_bytes()),
        Token::Nil => None,
        token => return Err(lexer.error(format!("expected section data, got {token:?}"))),
    };
    Ok(FetchItem::Section { name, origin, data })
}

/// Reads `[section]` and an optional `<origin>`.
///
/// The section text is taken verbatim; it may contain spaces and a
/// parenthesised header list.
fn parse_section_spec(lexer: &mut Lexer<'_>) -> Result<(String, Option<u32>)> {
    lexer.advance();
    let mut section = String::new();
    loop {
        match lexer.advance() {
            Some(b']') => break,
            Some(b'\r' | b'\n') | None => return Err(lexer.error("unterminated section")),
            Some(b) => section.push(char::from(b)),
        }
    }

    let mut origin = None;
    if lexer.peek() == Some(b'<') {
        lexer.advance();
        let mut digits = String::new();
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
            }
            digits.push(char::from(b));
        }
        origin = Some(
            digits
                .parse()
                .map_err(|_| lexer.error(format!("bad partial origin <{digits}>")))?,
        );
    }

    Ok((section.to_ascii_uppercase(), origin))
}

/// Parses an ENVELOPE list.
///
/// # Errors
///
/// A list that closes before all ten fields are present yields
/// `Error::MalformedResponse`.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    next_field(lexer)?;
    let subject = lexer.read_nstring()?;
    next_field(lexer)?;
    let from = parse_address_list(lexer)?;
    next_field(lexer)?;
    let sender = parse_address_list(lexer)?;
    next_field(lexer)?;
    let reply_to = parse_address_list(lexer)?;
    next_field(lexer)?;
    let to = parse_address_list(lexer)?;
    next_field(lexer)?;
    let cc = parse_address_list(lexer)?;
    next_field(lexer)?;
    let bcc = parse_address_list(lexer)?;
    next_field(lexer)?;
    let in_reply_to = lexer.read_nstring()?;
    next_field(lexer)?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

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

fn next_field(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b')') {
        return Err(Error::malformed(SHORT_ENVELOPE));
    }
    lexer.expect_space()
}

/// Parses an address list: NIL or `((...) (...))`.
fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.peek() {
        Some(b')') => return Err(Error::malformed(SHORT_ENVELOPE)),
        Some(b'(') => {}
        _ => {
            return match lexer.next_token()? {
                Token::Nil => Ok(Vec::new()),
                token => Err(lexer.error(format!("expected address list, got {token:?}"))),
            };
        }
    }

    lexer.advance();
    let mut addresses = Vec::new();
    loop {
        match lexer.peek() {
            Some(b')') => {
                lexer.advance();
                return Ok(addresses);
            }
            Some(b'(') => addresses.push(parse_address(lexer)?),
            Some(b' ') => {
                lexer.advance();
            }
            _ => return Err(lexer.error("unterminated address list")),
        }
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    fn items(input: &[u8]) -> Vec<FetchItem> {
        parse_fetch_items(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn envelope_with_addresses() {
        let input = b"(ENVELOPE (\"Mon, 7 Feb 1994 21:52:25 -0800\" \"hello\" ((NIL NIL \"a\" \"x.com\")) NIL NIL ((NIL NIL \"b\" \"x.com\") (\"Cee\" NIL \"c\" \"x.com\")) NIL NIL NIL \"<id@x.com>\"))";
        let parsed = items(input);
        let FetchItem::Envelope(env) = &parsed[0] else {
            panic!("expected envelope");
        };
        assert_eq!(env.subject.as_deref(), Some("hello"));
        assert_eq!(env.from[0].email().as_deref(), Some("a@x.com"));
        let to: Vec<String> = env.to.iter().filter_map(Address::email).collect();
        assert_eq!(to, vec!["b@x.com", "c@x.com"]);
        assert_eq!(env.to[1].name.as_deref(), Some("Cee"));
        assert!(env.sender.is_empty());
        assert_eq!(env.message_id.as_deref(), Some("<id@x.com>"));
    }

    #[test]
    fn short_envelope_is_malformed() {
        let input = b"(ENVELOPE (\"date\" \"subj\" NIL NIL NIL))";
        let err = parse_fetch_items(&mut Lexer::new(input)).unwrap_err();
        match err {
            Error::MalformedResponse { reason, .. } => assert_eq!(reason, SHORT_ENVELOPE),
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn literal_subject() {
        let input = b"(ENVELOPE (NIL {5}\r\nhe)lo NIL NIL NIL NIL NIL NIL NIL NIL))";
        let parsed = items(input);
        let FetchItem::Envelope(env) = &parsed[0] else {
            panic!("expected envelope");
        };
        assert_eq!(env.subject.as_deref(), Some("he)lo"));
    }

    #[test]
    fn body_section_literal() {
        let parsed = items(b"(UID 9 BODY[] {11}\r\nSubject: x\n RFC822.SIZE 11)");
        assert_eq!(parsed[0], FetchItem::Uid(Uid::new(9).unwrap()));
        assert_eq!(
            parsed[1],
            FetchItem::Section {
                name: String::new(),
                origin: None,
                data: Some(b"Subject: x\n".to_vec()),
            }
        );
        assert_eq!(parsed[2], FetchItem::Rfc822Size(11));
    }

    #[test]
    fn rfc822_maps_to_whole_message_section() {
        let parsed = items(b"(RFC822.HEADER {2}\r\nab RFC822 NIL)");
        assert!(matches!(&parsed[0], FetchItem::Section { name, .. } if name == "HEADER"));
        assert!(matches!(&parsed[1], FetchItem::Section { name, data: None, .. } if name.is_empty()));
    }

    #[test]
    fn header_fields_section_with_origin() {
        let parsed = items(b"(BODY[HEADER.FIELDS (SUBJECT)]<0> \"Subject: hi\")");
        assert_eq!(
            parsed[0],
            FetchItem::Section {
                name: "HEADER.FIELDS (SUBJECT)".into(),
                origin: Some(0),
                data: Some(b"Subject: hi".to_vec()),
            }
        );
    }

    #[test]
    fn unknown_items_are_skipped() {
        let parsed = items(
            b"(BODYSTRUCTURE (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 3 1) MODSEQ (12345) X-GM-LABELS (\\Inbox) FLAGS (\\Seen) INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")",
        );
        assert_eq!(parsed.len(), 2);
        assert!(matches!(&parsed[0], FetchItem::Flags(f) if f.is_seen()));
        assert_eq!(
            parsed[1],
            FetchItem::InternalDate("17-Jul-1996 02:44:25 -0700".into())
        );
    }
}
