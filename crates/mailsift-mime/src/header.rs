//! MIME header handling.

use crate::charset::CharsetRegistry;
use crate::encoding::decode_rfc2047_lossy;
use std::collections::HashMap;

/// Collection of email headers.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        self.headers.entry(name).or_default().push(value);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parses a raw header block.
    ///
    /// Folded lines are unfolded; lines without a colon are skipped.
    /// Parsing stops at the first empty line. 8-bit bytes that are not
    /// UTF-8 are replaced, encoded words are left encoded.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        let lines: Vec<&str> = text.lines().collect();

        for line in &lines {
            if line.is_empty() {
                // Empty line signals end of headers, but save current header first
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                }
                break;
            }

            // Check for continuation line (starts with space or tab)
            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
            } else {
                // Save previous header if exists
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                    current_value.clear();
                }

                // Parse new header
                if let Some((name, value)) = line.split_once(':') {
                    current_name = Some(name.trim().to_string());
                    current_value = value.trim().to_string();
                } else {
                    tracing::debug!(line = %line, "skipping header line without a colon");
                }
            }
        }

        // Save last header if we didn't hit an empty line
        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        headers
    }

    /// Gets the first value for a header with RFC 2047 encoded words
    /// decoded. Undecodable words are kept verbatim.
    #[must_use]
    pub fn get_decoded(&self, name: &str, charsets: &CharsetRegistry) -> Option<String> {
        self.get(name)
            .map(|value| decode_rfc2047_lossy(value, charsets))
    }

    /// Returns the number of header values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.values().map(Vec::len).sum()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Splits a message or part into its header block and body.
///
/// The body starts after the first empty line. Without one, everything is
/// header.
pub(crate) fn split_header(data: &[u8]) -> (&[u8], &[u8]) {
    if data.starts_with(b"\r\n") {
        return (&[], &data[2..]);
    }
    if data.starts_with(b"\n") {
        return (&[], &data[1..]);
    }
    let mut i = 0;
    while let Some(pos) = data[i..].iter().position(|&b| b == b'\n') {
        let end = i + pos + 1;
        if data[end..].starts_with(b"\r\n") {
            return (&data[..end], &data[end + 2..]);
        }
        if data[end..].starts_with(b"\n") {
            return (&data[..end], &data[end + 1..]);
        }
        i = end;
    }
    (data, &[])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_repeated() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("Received", "from b");
        assert_eq!(headers.get_all("received"), vec!["from a", "from b"]);
        assert_eq!(headers.get("Received"), Some("from a"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "X-Mailsift-Key: abc:123\r\n",
            "\r\n",
            "Not: a header\r\n"
        );

        let headers = Headers::parse(text.as_bytes());
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(headers.get("x-mailsift-key"), Some("abc:123"));
        assert!(headers.get("Not").is_none());
    }

    #[test]
    fn test_headers_decoded() {
        let headers = Headers::parse(b"Subject: =?utf-8?B?SMOpbGxv?= world\r\n");
        let charsets = CharsetRegistry::new();
        assert_eq!(
            headers.get_decoded("subject", &charsets).as_deref(),
            Some("H\u{e9}llo world")
        );
        assert!(headers.get_decoded("from", &charsets).is_none());
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let mut count = 0;
        for (name, value) in headers.iter() {
            assert!(!name.is_empty());
            assert!(!value.is_empty());
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_split_header() {
        let (head, body) = split_header(b"A: 1\r\nB: 2\r\n\r\nbody\r\n");
        assert_eq!(head, b"A: 1\r\nB: 2\r\n");
        assert_eq!(body, b"body\r\n");

        let (head, body) = split_header(b"A: 1\n\nbody");
        assert_eq!(head, b"A: 1\n");
        assert_eq!(body, b"body");

        let (head, body) = split_header(b"\r\nbody only");
        assert!(head.is_empty());
        assert_eq!(body, b"body only");

        let (head, body) = split_header(b"A: 1\r\n");
        assert_eq!(head, b"A: 1\r\n");
        assert!(body.is_empty());
    }
}
