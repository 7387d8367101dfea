//! Structured header parameters (`value; key=value; key="quoted"`).
//!
//! Also reassembles RFC 2231 parameter values: extended values
//! (`name*=charset'lang'%XX`) and continuations (`name*0=`, `name*1*=`).

use std::collections::HashMap;

use crate::charset::CharsetRegistry;
use crate::encoding::{decode_rfc2047, hex_value};
use crate::error::{Error, Result};

/// Parameters of a structured header, keyed by lowercased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: HashMap<String, String>,
}

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a header value into its leading token and parameters.
    ///
    /// Semicolons inside quoted strings do not split. Quotes are removed and
    /// backslash escapes resolved.
    #[must_use]
    pub fn parse(value: &str) -> (String, Self) {
        let mut pieces = split_unquoted(value).into_iter();
        let head = pieces.next().unwrap_or_default().trim().to_string();

        let mut params = Self::new();
        for piece in pieces {
            if let Some((key, value)) = piece.split_once('=') {
                let key = key.trim().to_ascii_lowercase();
                if !key.is_empty() {
                    params.values.insert(key, unquote(value.trim()));
                }
            }
        }
        (head, params)
    }

    /// Inserts a raw parameter value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Returns the raw value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if `name` is present in any form: plain, extended or
    /// continued.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.values.keys().any(|key| {
            key == &name || key.strip_suffix('*') == Some(name.as_str()) || section_of(key, &name).is_some()
        })
    }

    /// Returns the decoded value of `name`.
    ///
    /// Precedence: `name*` (extended), then `name*0`/`name*0*`
    /// continuations, then plain `name` with RFC 2047 encoded words decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedAttachmentHeader`] for a gap in the
    /// continuation numbers, a bad percent escape or an extended value in
    /// an unknown charset.
    pub fn decoded(&self, name: &str, charsets: &CharsetRegistry) -> Result<Option<String>> {
        let name = name.to_ascii_lowercase();

        if let Some(extended) = self.values.get(&format!("{name}*")) {
            let (charset, encoded) = split_extended(extended, &name)?;
            let bytes = percent_decode(encoded, &name)?;
            return decode_in(charsets, charset, &bytes, &name).map(Some);
        }

        let mut sections: Vec<(u32, bool, &str)> = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                section_of(key, &name).map(|(index, extended)| (index, extended, value.as_str()))
            })
            .collect();
        if !sections.is_empty() {
            return join_continuations(&mut sections, &name, charsets).map(Some);
        }

        match self.values.get(&name) {
            Some(plain) => decode_rfc2047(plain, charsets)
                .map(Some)
                .map_err(|e| Error::MalformedAttachmentHeader(format!("{name}: {e}"))),
            None => Ok(None),
        }
    }
}

/// Parses `name*N` or `name*N*` into the section number and whether the
/// section is percent-encoded.
fn section_of(key: &str, name: &str) -> Option<(u32, bool)> {
    let rest = key.strip_prefix(name)?.strip_prefix('*')?;
    let (digits, extended) = rest
        .strip_suffix('*')
        .map_or((rest, false), |digits| (digits, true));
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (index, extended))
}

fn join_continuations(
    sections: &mut [(u32, bool, &str)],
    name: &str,
    charsets: &CharsetRegistry,
) -> Result<String> {
    sections.sort_unstable_by_key(|(index, ..)| *index);

    let mut charset = "";
    let mut bytes = Vec::new();
    for (expected, &(index, extended, value)) in (0u32..).zip(sections.iter()) {
        if index != expected {
            return Err(Error::MalformedAttachmentHeader(format!(
                "{name}: continuation {expected} missing"
            )));
        }
        match (index, extended) {
            (0, true) => {
                let (cs, encoded) = split_extended(value, name)?;
                charset = cs;
                bytes.extend(percent_decode(encoded, name)?);
            }
            (_, true) => bytes.extend(percent_decode(value, name)?),
            (_, false) => bytes.extend_from_slice(value.as_bytes()),
        }
    }

    decode_in(charsets, charset, &bytes, name)
}

/// Splits `charset'language'value`.
fn split_extended<'v>(value: &'v str, name: &str) -> Result<(&'v str, &'v str)> {
    let mut parts = value.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(encoded)) => Ok((charset, encoded)),
        _ => Err(Error::MalformedAttachmentHeader(format!(
            "{name}: extended value without charset'language' prefix"
        ))),
    }
}

fn percent_decode(value: &str, name: &str) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            let (Some(hi), Some(lo)) = (hi, lo) else {
                return Err(Error::MalformedAttachmentHeader(format!(
                    "{name}: bad percent escape at byte {i}"
                )));
            };
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn decode_in(charsets: &CharsetRegistry, charset: &str, bytes: &[u8], name: &str) -> Result<String> {
    charsets.decode(charset, bytes).map_err(|e| match e {
        Error::UnsupportedCharset(cs) => {
            Error::MalformedAttachmentHeader(format!("{name}: unknown charset {cs}"))
        }
        other => other,
    })
}

fn split_unquoted(value: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);
    pieces
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .map(|v| v.strip_suffix('"').unwrap_or(v))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decoded(header: &str, name: &str) -> Result<Option<String>> {
        let (_, params) = Parameters::parse(header);
        params.decoded(name, &CharsetRegistry::new())
    }

    #[test]
    fn quoted_semicolons_do_not_split() {
        let (head, params) =
            Parameters::parse("attachment; filename=\"a;b \\\"c\\\".txt\"; size=12");
        assert_eq!(head, "attachment");
        assert_eq!(params.get("FILENAME"), Some("a;b \"c\".txt"));
        assert_eq!(params.get("size"), Some("12"));
    }

    #[test]
    fn plain_and_missing() {
        assert_eq!(
            decoded("attachment; filename=report.pdf", "filename").unwrap(),
            Some("report.pdf".to_string())
        );
        assert_eq!(decoded("inline", "filename").unwrap(), None);
    }

    #[test]
    fn rfc2047_in_plain_value() {
        assert_eq!(
            decoded("attachment; filename=\"=?utf-8?B?5oql5ZGKLnBkZg==?=\"", "filename").unwrap(),
            Some("报告.pdf".to_string())
        );
    }

    #[test]
    fn extended_value() {
        assert_eq!(
            decoded("attachment; filename*=utf-8''%E6%8A%A5%E5%91%8A.pdf", "filename").unwrap(),
            Some("报告.pdf".to_string())
        );
        assert_eq!(
            decoded("attachment; filename*=gb2312'zh'%C4%E3%BA%C3.txt", "filename").unwrap(),
            Some("你好.txt".to_string())
        );
    }

    #[test]
    fn continuations() {
        let header = "attachment; filename*1=\"-part.txt\"; filename*0*=utf-8''caf%C3%A9";
        assert_eq!(
            decoded(header, "filename").unwrap(),
            Some("café-part.txt".to_string())
        );
        let (_, params) = Parameters::parse(header);
        assert!(params.has("filename"));
        assert!(!params.has("name"));
    }

    #[test]
    fn continuation_gap() {
        let header = "attachment; filename*0=a; filename*2=c";
        let err = decoded(header, "filename").unwrap_err();
        assert!(matches!(err, Error::MalformedAttachmentHeader(_)));
    }

    #[test]
    fn bad_percent_escape() {
        let err = decoded("attachment; filename*=utf-8''bad%G1", "filename").unwrap_err();
        assert!(matches!(err, Error::MalformedAttachmentHeader(_)));
    }

    #[test]
    fn unknown_extended_charset() {
        let err = decoded("attachment; filename*=x-nope''abc", "filename").unwrap_err();
        assert!(matches!(err, Error::MalformedAttachmentHeader(ref m) if m.contains("x-nope")));
    }

    #[test]
    fn extended_takes_precedence() {
        let header = "attachment; filename=fallback.txt; filename*=utf-8''real.txt";
        let (_, params) = Parameters::parse(header);
        assert!(params.has("filename"));
        assert_eq!(
            decoded(header, "filename").unwrap(),
            Some("real.txt".to_string())
        );
    }
}
