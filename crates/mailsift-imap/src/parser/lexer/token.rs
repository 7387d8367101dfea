//! Lexer tokens.

/// One lexical unit of a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom, borrowed from the input.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(String),
    /// Literal payload, `{n}\r\n` prefix stripped.
    Literal(&'a [u8]),
    /// Number.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`, untagged prefix.
    Asterisk,
    /// `+`, continuation prefix.
    Plus,
    /// `NIL`, case-insensitive.
    Nil,
    /// Line terminator.
    Crlf,
    /// End of input.
    Eof,
}
