//! Parser helper functions.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, Flags, ResponseCode, SeqNum, Uid, UidValidity};

/// Parses `[CODE args]` at the start of response text.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let atom = lexer.read_atom()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => code_number(lexer)?
            .and_then(Uid::new)
            .map_or_else(|| ResponseCode::Other(atom.to_string()), ResponseCode::UidNext),
        "UIDVALIDITY" => code_number(lexer)?.and_then(UidValidity::new).map_or_else(
            || ResponseCode::Other(atom.to_string()),
            ResponseCode::UidValidity,
        ),
        "UNSEEN" => code_number(lexer)?
            .and_then(SeqNum::new)
            .map_or_else(|| ResponseCode::Other(atom.to_string()), ResponseCode::Unseen),
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        _ => ResponseCode::Other(atom.to_string()),
    };

    // codes may carry arguments we do not interpret
    while !matches!(lexer.peek(), Some(b']') | None) {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;
    Ok(code)
}

/// Numeric code argument; `None` if the server sent something else.
fn code_number(lexer: &mut Lexer<'_>) -> Result<Option<u32>> {
    lexer.expect_space()?;
    Ok(match lexer.next_token()? {
        Token::Number(n) => Some(n),
        _ => None,
    })
}

/// Parses space-separated capability atoms up to the end of the data.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(s)),
            Token::Number(n) => caps.push(Capability::Other(n.to_string())),
            _ => break,
        }
    }
    Ok(caps)
}

/// Parses a parenthesised flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            // `\*` lexes as the atom "\" followed by an asterisk
            Token::Atom("\\") if lexer.peek() == Some(b'*') => {
                lexer.advance();
                flags.insert(Flag::Wildcard);
            }
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => {
                return Err(lexer.error(format!("unexpected token in flag list: {token:?}")));
            }
        }
    }
    Ok(flags)
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_data(lexer: &mut Lexer<'_>) -> Result<Vec<SeqNum>> {
    let mut nums = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) => nums.extend(SeqNum::new(n)),
            // trailing space before CRLF
            Token::Crlf | Token::Eof => break,
            token => return Err(lexer.error(format!("unexpected token in SEARCH: {token:?}"))),
        }
    }
    Ok(nums)
}
