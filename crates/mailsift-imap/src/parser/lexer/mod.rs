//! Tokenizer for server responses.
//!
//! Works on one complete response (line plus embedded literals) as produced
//! by the framing layer; it never reads from the network.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// Largest literal the client accepts, in bytes.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Cursor over a response buffer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true once all input is consumed.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consumes one byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'\n' => {
                // bare LF from sloppy servers
                self.pos += 1;
                Ok(Token::Crlf)
            }
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => Ok(self.read_atom_or_number()),
            _ => Err(self.error(format!("unexpected byte {byte:#04x}"))),
        }
    }

    /// Reads a quoted string. Non-UTF-8 bytes are replaced, servers do send
    /// raw 8-bit headers inside quotes.
    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => out.push(c),
                    Some(c) => {
                        // not a valid escape; keep both bytes
                        out.push(b'\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(c) => out.push(c),
            }
        }
        Ok(Token::QuotedString(
            String::from_utf8_lossy(&out).into_owned(),
        ))
    }

    /// Reads `{n}\r\n` (or the `{n+}` form) and the `n` bytes that follow.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let size: usize = std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid literal size"))?;
        if size > MAX_LITERAL_SIZE {
            return Err(self.error(format!("literal of {size} bytes exceeds limit")));
        }
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("expected '}' after literal size"));
        }
        match (self.advance(), self.peek()) {
            (Some(b'\r'), Some(b'\n')) => self.pos += 1,
            (Some(b'\n'), _) => {}
            _ => return Err(self.error("expected CRLF after literal size")),
        }
        let end = self.pos + size;
        if end > self.input.len() {
            return Err(self.error("incomplete literal"));
        }
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_atom_or_number(&mut self) -> Token<'a> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        let bytes = &self.input[start..self.pos];
        // atom chars are ASCII
        let s = std::str::from_utf8(bytes).unwrap_or_default();

        if bytes.iter().all(u8::is_ascii_digit)
            && let Ok(n) = s.parse::<u32>()
        {
            return Token::Number(n);
        }
        if s.eq_ignore_ascii_case("NIL") {
            Token::Nil
        } else {
            Token::Atom(s)
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    /// Consumes a token of the same kind as `expected`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, quoted string or literal).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(data).into_owned()),
            token => Err(self.error(format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads an nstring (NIL, quoted string or literal).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
            token => Err(self.error(format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(format!("expected atom, got {token:?}"))),
        }
    }

    /// Returns the rest of the current line as text and moves past its CRLF.
    pub fn read_text_until_crlf(&mut self) -> String {
        let rest = self.remaining();
        let end = rest.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(rest.len());
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.skip(end);
        if self.peek() == Some(b'\r') {
            self.skip(1);
        }
        if self.peek() == Some(b'\n') {
            self.skip(1);
        }
        text
    }

    /// Skips one balanced value: an atom, string, literal or parenthesised
    /// list, including any `[...]` and `<...>` suffix on an atom.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("unbalanced parenthesis"))?;
                }
                Token::Eof | Token::Crlf => return Err(self.error("value ends early")),
                _ => {}
            }
            if depth == 0 && !matches!(self.peek(), Some(b'[' | b'<')) {
                return Ok(());
            }
            if self.peek() == Some(b'<') {
                while let Some(b) = self.advance() {
                    if b == b'>' {
                        break;
                    }
                }
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns true if `b` may appear in an atom.
///
/// `\` is accepted so flags such as `\Seen` lex as one atom, and `]` is
/// excluded so response codes close properly.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7E)
        && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'[' | b']')
}
