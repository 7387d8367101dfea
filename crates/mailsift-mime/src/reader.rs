//! Lazy multipart walker.
//!
//! [`MimeReader`] keeps a single forward cursor into the raw message. Each
//! call to [`MimeReader::next_part`] scans to the next boundary and decodes
//! only that part; nested multiparts are entered depth-first.

use crate::charset::CharsetRegistry;
use crate::content_type::ContentType;
use crate::error::Error;
use crate::header::{Headers, split_header};
use crate::part::MimePart;

/// Default limit on multipart nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    charsets: CharsetRegistry,
    max_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            charsets: CharsetRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReaderConfig {
    /// Creates a configuration with the built-in charsets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `charsets` for text decoding.
    #[must_use]
    pub fn with_charsets(mut self, charsets: CharsetRegistry) -> Self {
        self.charsets = charsets;
        self
    }

    /// Sets how deep multiparts may nest. A multipart below this depth is
    /// returned as a single opaque part.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// The charset registry.
    #[must_use]
    pub const fn charsets(&self) -> &CharsetRegistry {
        &self.charsets
    }
}

/// One open multipart: the remaining bytes and its boundary.
#[derive(Debug)]
struct Frame<'a> {
    boundary: Vec<u8>,
    rest: &'a [u8],
    default_type: ContentType,
    started: bool,
    done: bool,
}

impl<'a> Frame<'a> {
    fn new(boundary: &str, body: &'a [u8], content_type: &ContentType) -> Self {
        let default_type = if content_type.is("multipart", "digest") {
            ContentType::message_rfc822()
        } else {
            ContentType::text_plain()
        };
        Self {
            boundary: boundary.as_bytes().to_vec(),
            rest: body,
            default_type,
            started: false,
            done: false,
        }
    }

    /// Returns the raw bytes (headers and body) of the next part.
    fn next_section(&mut self) -> Option<&'a [u8]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            // skip the preamble
            let Some((_, end)) = find_delimiter(self.rest, &self.boundary) else {
                tracing::debug!("multipart body without a delimiter line");
                self.done = true;
                return None;
            };
            if self.advance(end) {
                return None;
            }
        }

        let rest = self.rest;
        if let Some((content_end, end)) = find_delimiter(rest, &self.boundary) {
            self.advance(end);
            return Some(&rest[..content_end]);
        }

        // no closing delimiter: the last part runs to the end
        self.done = true;
        (!rest.is_empty()).then_some(rest)
    }

    /// Moves past the delimiter line ending at `end`. Returns true if it was
    /// the closing delimiter.
    fn advance(&mut self, end: usize) -> bool {
        let after = &self.rest[end..];
        let closing = after.starts_with(b"--");
        let line_end = after
            .iter()
            .position(|&b| b == b'\n')
            .map_or(after.len(), |p| p + 1);
        self.rest = &after[line_end..];
        if closing {
            self.done = true;
        }
        closing
    }
}

/// Finds the next `--boundary` at the start of a line.
///
/// Returns where the preceding content ends (before its line break) and
/// where the boundary marker ends.
fn find_delimiter(data: &[u8], boundary: &[u8]) -> Option<(usize, usize)> {
    let mut line_start = 0;
    loop {
        let line = &data[line_start..];
        if line.starts_with(b"--")
            && line[2..].starts_with(boundary)
            && ends_delimiter(&line[2 + boundary.len()..])
        {
            let content_end = match line_start {
                0 => 0,
                n if n >= 2 && data[n - 2] == b'\r' => n - 2,
                n => n - 1,
            };
            return Some((content_end, line_start + 2 + boundary.len()));
        }
        let newline = line.iter().position(|&b| b == b'\n')?;
        line_start += newline + 1;
    }
}

/// A boundary may only be followed by `--`, whitespace or the line end.
fn ends_delimiter(after: &[u8]) -> bool {
    matches!(after.first(), None | Some(b'-' | b'\r' | b'\n' | b' ' | b'\t'))
}

/// Walks the parts of a raw RFC 5322 message.
///
/// The first item is the top-level header as
/// [`PartHeader::Generic`](crate::PartHeader::Generic) with an empty body.
/// After it come the leaf parts in document order. The sequence is finite
/// and cannot be restarted.
///
/// ```
/// use mailsift_mime::{MimeReader, PartHeader, ReaderConfig};
///
/// let raw = b"Subject: hi\r\nContent-Type: text/plain\r\n\r\nhello\r\n";
/// let config = ReaderConfig::new();
/// let mut reader = MimeReader::new(raw, &config);
///
/// let header = reader.next_part().unwrap();
/// assert!(matches!(header.header, PartHeader::Generic(_)));
///
/// let body = reader.next_part().unwrap();
/// assert_eq!(body.body, b"hello\r\n");
/// assert!(reader.next_part().is_none());
/// ```
#[derive(Debug)]
pub struct MimeReader<'a> {
    config: &'a ReaderConfig,
    header: Headers,
    header_pending: bool,
    root: Option<&'a [u8]>,
    stack: Vec<Frame<'a>>,
    yielded: usize,
}

impl<'a> MimeReader<'a> {
    /// Parses the top-level header of `raw`. The body is not touched until
    /// [`MimeReader::next_part`] is called.
    #[must_use]
    pub fn new(raw: &'a [u8], config: &'a ReaderConfig) -> Self {
        let (head, body) = split_header(raw);
        Self {
            config,
            header: Headers::parse(head),
            header_pending: true,
            root: Some(body),
            stack: Vec::new(),
            yielded: 0,
        }
    }

    /// The top-level message header.
    #[must_use]
    pub const fn header(&self) -> &Headers {
        &self.header
    }

    /// Returns the next part, or `None` once the message is exhausted.
    pub fn next_part(&mut self) -> Option<MimePart> {
        if self.header_pending {
            self.header_pending = false;
            return Some(MimePart::generic(self.header.clone()));
        }

        if let Some(body) = self.root.take() {
            let headers = self.header.clone();
            if let Some(part) = self.enter(headers, body, &ContentType::text_plain()) {
                return Some(self.emit(part));
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(section) = frame.next_section() else {
                self.stack.pop();
                continue;
            };
            let default_type = frame.default_type.clone();

            let (head, body) = split_header(section);
            if let Some(part) = self.enter(Headers::parse(head), body, &default_type) {
                return Some(self.emit(part));
            }
        }
    }

    /// Opens a multipart, or decodes a leaf part.
    fn enter(&mut self, headers: Headers, body: &'a [u8], default_type: &ContentType) -> Option<MimePart> {
        let content_type = headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok());

        if let Some(ct) = content_type.as_ref().filter(|ct| ct.is_multipart()) {
            let Some(boundary) = ct.boundary() else {
                let mut part = MimePart::build(headers, body, default_type, self.config.charsets());
                part.record(Error::MissingBoundary);
                return Some(part);
            };
            if self.stack.len() >= self.config.max_depth {
                let mut part = MimePart::build(headers, body, default_type, self.config.charsets());
                part.record(Error::InvalidMultipart(format!(
                    "nested deeper than {}",
                    self.config.max_depth
                )));
                return Some(part);
            }
            tracing::trace!(depth = self.stack.len() + 1, subtype = %ct.sub_type, "entering multipart");
            self.stack.push(Frame::new(boundary, body, ct));
            return None;
        }

        Some(MimePart::build(headers, body, default_type, self.config.charsets()))
    }

    fn emit(&mut self, part: MimePart) -> MimePart {
        self.yielded += 1;
        for error in part.errors() {
            tracing::warn!(part = self.yielded, error = %error, "MIME part decoded with errors");
        }
        part
    }
}

impl Iterator for MimeReader<'_> {
    type Item = MimePart;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_part()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::PartHeader;

    fn parts(raw: &[u8]) -> Vec<MimePart> {
        let config = ReaderConfig::new();
        MimeReader::new(raw, &config).skip(1).collect()
    }

    #[test]
    fn find_delimiter_at_line_start_only() {
        let data = b"pre --b not\r\n--b\r\nbody\r\n--b--\r\n";
        let (end, marker) = find_delimiter(data, b"b").unwrap();
        assert_eq!(end, 11);
        assert_eq!(&data[marker..marker + 2], b"\r\n");
        assert!(find_delimiter(b"no delimiter", b"b").is_none());
        assert!(find_delimiter(b"--bother\r\n", b"b").is_none());
    }

    #[test]
    fn single_part_message() {
        let raw = b"Subject: hi\r\n\r\nhello";
        let config = ReaderConfig::new();
        let mut reader = MimeReader::new(raw, &config);
        assert_eq!(reader.header().get("subject"), Some("hi"));

        let first = reader.next_part().unwrap();
        let PartHeader::Generic(headers) = &first.header else {
            panic!("expected the message header first");
        };
        assert_eq!(headers.get("subject"), Some("hi"));
        assert!(first.body.is_empty());

        let body = reader.next_part().unwrap();
        assert!(body.is_inline_text());
        assert_eq!(body.body, b"hello");
        assert!(reader.next_part().is_none());
        assert!(reader.next_part().is_none());
    }

    #[test]
    fn n_parts_in_order_then_none() {
        let raw = b"Content-Type: multipart/mixed; boundary=\"sep\"\r\n\r\n\
preamble\r\n\
--sep\r\n\r\none\r\n\
--sep\r\nContent-Type: text/plain\r\n\r\ntwo\r\n\
--sep\r\nContent-Type: text/html\r\n\r\n<b>three</b>\r\n\
--sep--\r\nepilogue\r\n";
        let config = ReaderConfig::new();
        let mut reader = MimeReader::new(raw, &config);
        reader.next_part().unwrap(); // header

        let bodies: Vec<Vec<u8>> = reader.by_ref().map(|p| p.body).collect();
        assert_eq!(bodies, vec![b"one".to_vec(), b"two".to_vec(), b"<b>three</b>".to_vec()]);
        assert!(reader.next_part().is_none());
    }

    #[test]
    fn nested_multipart_depth_first() {
        let raw = b"Content-Type: multipart/mixed; boundary=outer\r\n\r\n\
--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\nContent-Type: text/plain\r\n\r\nplain\r\n\
--inner\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n\
--inner--\r\n\
--outer\r\nContent-Type: application/pdf\r\nContent-Disposition: attachment; filename=a.pdf\r\n\r\n%PDF\r\n\
--outer--\r\n";
        let parts = parts(raw);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].body, b"plain");
        assert_eq!(parts[1].body, b"<p>html</p>");
        assert_eq!(parts[2].header.filename(), Some("a.pdf"));
        assert_eq!(parts[2].body, b"%PDF");
    }

    #[test]
    fn duplicate_attachment_names_are_both_returned() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Disposition: attachment; filename=same.txt\r\n\r\nfirst\r\n\
--b\r\nContent-Disposition: attachment; filename=same.txt\r\n\r\nsecond\r\n\
--b--\r\n";
        let parts = parts(raw);
        let names: Vec<_> = parts.iter().map(|p| p.header.filename()).collect();
        assert_eq!(names, vec![Some("same.txt"), Some("same.txt")]);
        assert_eq!(parts[0].body, b"first");
        assert_eq!(parts[1].body, b"second");
    }

    #[test]
    fn gb2312_part_is_transcoded() {
        let mut raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain; charset=gb2312\r\n\r\n"
            .to_vec();
        raw.extend_from_slice(&[0xC4, 0xE3, 0xBA, 0xC3]);
        raw.extend_from_slice(b"\r\n--b--\r\n");

        let parts = parts(&raw);
        assert_eq!(parts.len(), 1);
        assert_eq!(String::from_utf8(parts[0].body.clone()).unwrap(), "你好");
    }

    #[test]
    fn bad_part_does_not_stop_the_walk() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain; charset=x-unknown\r\n\r\nraw\r\n\
--b\r\nContent-Disposition: attachment; filename*=utf-8''bad%ZZ\r\n\r\nbytes\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nfine\r\n\
--b--\r\n";
        let parts = parts(raw);
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0].errors(), [Error::UnsupportedCharset(_)]));
        assert_eq!(parts[0].body, b"raw");
        assert!(matches!(parts[1].errors(), [Error::MalformedAttachmentHeader(_)]));
        assert_eq!(parts[1].body, b"bytes");
        assert!(parts[2].errors().is_empty());
        assert_eq!(parts[2].body, b"fine");
    }

    #[test]
    fn missing_boundary_is_one_part() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nwhatever";
        let parts = parts(raw);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].errors(), &[Error::MissingBoundary]);
        assert_eq!(parts[0].body, b"whatever");
    }

    #[test]
    fn unterminated_multipart() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nfirst\r\n--b\r\n\r\nlast";
        let bodies: Vec<Vec<u8>> = parts(raw).into_iter().map(|p| p.body).collect();
        assert_eq!(bodies, vec![b"first".to_vec(), b"last".to_vec()]);
    }

    #[test]
    fn depth_limit() {
        let raw = b"Content-Type: multipart/mixed; boundary=a\r\n\r\n\
--a\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\ndeep\r\n--b--\r\n\
--a--\r\n";
        let config = ReaderConfig::new().max_depth(1);
        let parts: Vec<MimePart> = MimeReader::new(raw, &config).skip(1).collect();
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0].errors(), [Error::InvalidMultipart(_)]));
    }

    #[test]
    fn quoted_printable_body() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\ncaf=C3=A9 =\r\nau lait";
        let parts = parts(raw);
        assert_eq!(parts[0].body, "café au lait".as_bytes());
    }

    #[test]
    fn custom_charset_from_config() {
        let mut charsets = CharsetRegistry::new();
        charsets.register("x-rot13", |bytes: &[u8]| {
            bytes
                .iter()
                .map(|&b| match b {
                    b'a'..=b'z' => char::from((b - b'a' + 13) % 26 + b'a'),
                    other => char::from(other),
                })
                .collect()
        });
        let config = ReaderConfig::new().with_charsets(charsets);
        let raw = b"Content-Type: text/plain; charset=x-rot13\r\n\r\nuryyb";
        let parts: Vec<MimePart> = MimeReader::new(raw, &config).skip(1).collect();
        assert_eq!(parts[0].body, b"hello");
    }

    proptest! {
        #[test]
        fn arbitrary_input_terminates(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
            let config = ReaderConfig::new();
            let count = MimeReader::new(&raw, &config).take(1024).count();
            prop_assert!(count >= 1 && count < 1024);
        }

        #[test]
        fn every_section_is_yielded(bodies in proptest::collection::vec("[a-z ]{0,20}", 1..8)) {
            let mut raw = String::from("Content-Type: multipart/mixed; boundary=zz\r\n\r\n");
            for body in &bodies {
                raw.push_str("--zz\r\n\r\n");
                raw.push_str(body);
                raw.push_str("\r\n");
            }
            raw.push_str("--zz--\r\n");

            let config = ReaderConfig::new();
            let got: Vec<String> = MimeReader::new(raw.as_bytes(), &config)
                .skip(1)
                .map(|p| String::from_utf8(p.body).unwrap())
                .collect();
            prop_assert_eq!(got, bodies);
        }
    }
}
