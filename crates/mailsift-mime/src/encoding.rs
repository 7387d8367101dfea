//! Transfer and header decoding.
//!
//! Supports Base64, Quoted-Printable and RFC 2047 encoded words.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::charset::CharsetRegistry;
use crate::error::{Error, Result};

/// Content-Transfer-Encoding of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit data.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding value. Unknown values fall back to
    /// 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Undoes the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid for its encoding.
    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(body),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(body.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045) into raw bytes.
///
/// Soft line breaks (`=` at end of line) are removed. The result is in the
/// part's charset, not necessarily UTF-8.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // soft line break, allowing trailing whitespace before the newline
        let mut j = i + 1;
        while j < data.len() && (data[j] == b' ' || data[j] == b'\t') {
            j += 1;
        }
        if data[j..].starts_with(b"\r\n") {
            i = j + 2;
            continue;
        }
        if data[j..].starts_with(b"\n") {
            i = j + 1;
            continue;
        }
        if j == data.len() {
            break;
        }

        let hi = data.get(i + 1).copied().and_then(hex_value);
        let lo = data.get(i + 2).copied().and_then(hex_value);
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                result.push((hi << 4) | lo);
                i += 3;
            }
            _ => {
                return Err(Error::InvalidEncoding(format!(
                    "invalid quoted-printable escape at byte {i}"
                )));
            }
        }
    }

    Ok(result)
}

pub(crate) const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes RFC 2047 encoded words in a header value.
///
/// Text outside encoded words is kept as is; whitespace between two adjacent
/// encoded words is dropped. Format: `=?charset?encoding?encoded-text?=`.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed or names a charset the
/// registry cannot decode.
pub fn decode_rfc2047(text: &str, charsets: &CharsetRegistry) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        let Some((word, consumed)) = split_encoded_word(candidate) else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            last_was_word = false;
            continue;
        };

        if !(last_was_word && before.trim().is_empty()) {
            out.push_str(before);
        }
        out.push_str(&decode_word(word, charsets)?);
        rest = &candidate[consumed..];
        last_was_word = true;
    }

    out.push_str(rest);
    Ok(out)
}

/// Decodes encoded words, falling back to the raw value on error.
#[must_use]
pub fn decode_rfc2047_lossy(text: &str, charsets: &CharsetRegistry) -> String {
    decode_rfc2047(text, charsets).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "keeping undecodable header value");
        text.to_string()
    })
}

/// Splits `=?cs?e?text?=` off the front of `s`, returning the inner part and
/// the number of bytes consumed.
fn split_encoded_word(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let encoding_end = charset_end + 1 + inner[charset_end + 1..].find('?')?;
    let text_end = encoding_end + 1 + inner[encoding_end + 1..].find("?=")?;
    let word = &inner[..text_end];
    if word.contains(char::is_whitespace) {
        return None;
    }
    Some((word, text_end + 4))
}

fn decode_word(word: &str, charsets: &CharsetRegistry) -> Result<String> {
    let mut parts = word.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(encoded)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidEncoding(format!("invalid encoded word: {word}")));
    };
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => decode_base64(encoded.as_bytes())?,
        "Q" | "q" => decode_quoted_printable(encoded.replace('_', " ").as_bytes())?,
        other => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoding: {other}"
            )));
        }
    };
    charsets.decode(charset, &bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let decoded = decode_base64(b"SGVsbG8s\r\nIFdvcmxkIQ==\r\n").unwrap();
        assert_eq!(decoded, b"Hello, World!");
        assert!(decode_base64(b"not base64!").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!").unwrap(), b"Hello, World!");
        assert_eq!(
            decode_quoted_printable(b"H=C3=A9llo").unwrap(),
            "Héllo".as_bytes()
        );
        // non-UTF-8 bytes survive
        assert_eq!(decode_quoted_printable(b"=C4=E3").unwrap(), vec![0xC4, 0xE3]);
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello= \nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"trailing=").unwrap(), b"trailing");
    }

    #[test]
    fn test_quoted_printable_bad_escape() {
        let err = decode_quoted_printable(b"bad=ZZ").unwrap_err();
        assert!(matches!(err, Error::InvalidEncoding(_)));
    }

    #[test]
    fn test_rfc2047_decode() {
        let charsets = CharsetRegistry::new();
        assert_eq!(decode_rfc2047("Hello", &charsets).unwrap(), "Hello");
        assert_eq!(
            decode_rfc2047("=?utf-8?B?SMOpbGxv?=", &charsets).unwrap(),
            "Héllo"
        );
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?=", &charsets).unwrap(),
            "Héllo there"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_and_plain_text() {
        let charsets = CharsetRegistry::new();
        let value = "Re: =?utf-8?Q?caf=C3=A9?= =?utf-8?Q?_au_lait?= today";
        assert_eq!(
            decode_rfc2047(value, &charsets).unwrap(),
            "Re: café au lait today"
        );
    }

    #[test]
    fn test_rfc2047_gb2312() {
        let charsets = CharsetRegistry::new();
        assert_eq!(
            decode_rfc2047("=?gb2312?B?xOO6ww==?=", &charsets).unwrap(),
            "你好"
        );
    }

    #[test]
    fn test_rfc2047_unknown_charset() {
        let charsets = CharsetRegistry::new();
        let value = "=?x-unknown?Q?abc?=";
        assert!(matches!(
            decode_rfc2047(value, &charsets),
            Err(Error::UnsupportedCharset(_))
        ));
        assert_eq!(decode_rfc2047_lossy(value, &charsets), value);
    }

    #[test]
    fn test_rfc2047_not_a_word() {
        let charsets = CharsetRegistry::new();
        assert_eq!(decode_rfc2047("a =? b", &charsets).unwrap(), "a =? b");
    }
}
