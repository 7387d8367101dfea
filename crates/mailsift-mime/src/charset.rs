//! Charset decoding.
//!
//! A [`CharsetRegistry`] turns bytes in a named charset into UTF-8. It knows
//! the charsets `mail-parser` ships decoders for (the ISO-8859 family,
//! windows-125x, KOI8, GB2312/GBK/GB18030, Big5, Shift_JIS, EUC-*, ...) and
//! accepts custom decoders on top. There is no process-wide hook: the
//! registry travels in [`ReaderConfig`](crate::ReaderConfig).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mail_parser::decoders::charsets::map::charset_decoder;

use crate::error::{Error, Result};

/// A custom charset decoder.
pub type CustomDecoder = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// Maps charset names to decoders.
#[derive(Clone, Default)]
pub struct CharsetRegistry {
    custom: HashMap<String, CustomDecoder>,
}

impl CharsetRegistry {
    /// Creates a registry with the built-in decoders only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a decoder for `charset`, taking precedence over a built-in
    /// decoder of the same name. Names are case-insensitive.
    pub fn register(
        &mut self,
        charset: &str,
        decoder: impl Fn(&[u8]) -> String + Send + Sync + 'static,
    ) {
        self.custom
            .insert(charset.trim().to_ascii_lowercase(), Arc::new(decoder));
    }

    /// Returns true if `charset` can be decoded.
    #[must_use]
    pub fn supports(&self, charset: &str) -> bool {
        let name = charset.trim().to_ascii_lowercase();
        is_utf8_compatible(&name)
            || self.custom.contains_key(&name)
            || charset_decoder(name.as_bytes()).is_some()
    }

    /// Decodes `bytes` from `charset` into UTF-8.
    ///
    /// US-ASCII, UTF-8 and an empty name are read as UTF-8, replacing
    /// invalid sequences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if no decoder is known.
    pub fn decode(&self, charset: &str, bytes: &[u8]) -> Result<String> {
        let name = charset.trim().trim_matches('"').to_ascii_lowercase();

        if let Some(decoder) = self.custom.get(&name) {
            return Ok(decoder(bytes));
        }
        if is_utf8_compatible(&name) {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }
        charset_decoder(name.as_bytes())
            .map(|decode| decode(bytes))
            .ok_or_else(|| Error::UnsupportedCharset(charset.trim().to_string()))
    }
}

impl fmt::Debug for CharsetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CharsetRegistry")
            .field("custom", &names)
            .finish()
    }
}

fn is_utf8_compatible(name: &str) -> bool {
    matches!(
        name,
        "" | "utf-8" | "utf8" | "us-ascii" | "ascii" | "ansi_x3.4-1968"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passthrough() {
        let registry = CharsetRegistry::new();
        assert_eq!(registry.decode("UTF-8", "héllo".as_bytes()).unwrap(), "héllo");
        assert_eq!(registry.decode("us-ascii", b"plain").unwrap(), "plain");
        assert_eq!(registry.decode("", b"plain").unwrap(), "plain");
    }

    #[test]
    fn gb2312() {
        let registry = CharsetRegistry::new();
        assert_eq!(
            registry.decode("gb2312", &[0xC4, 0xE3, 0xBA, 0xC3]).unwrap(),
            "你好"
        );
        assert!(registry.supports("GB2312"));
    }

    #[test]
    fn latin1() {
        let registry = CharsetRegistry::new();
        assert_eq!(registry.decode("iso-8859-1", &[0x63, 0x61, 0x66, 0xE9]).unwrap(), "café");
    }

    #[test]
    fn unknown_charset() {
        let registry = CharsetRegistry::new();
        let err = registry.decode("x-klingon", b"abc").unwrap_err();
        assert_eq!(err, Error::UnsupportedCharset("x-klingon".to_string()));
        assert!(!registry.supports("x-klingon"));
    }

    #[test]
    fn custom_decoder_wins() {
        let mut registry = CharsetRegistry::new();
        registry.register("X-Upper", |bytes: &[u8]| {
            String::from_utf8_lossy(bytes).to_uppercase()
        });
        assert!(registry.supports("x-upper"));
        assert_eq!(registry.decode("x-upper", b"abc").unwrap(), "ABC");
        assert!(format!("{registry:?}").contains("x-upper"));
    }
}
