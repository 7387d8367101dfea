//! Projection of fetched messages into [`SearchResult`]s.

use chrono::{DateTime, FixedOffset};
use mailsift_imap::{Address, Message};
use mailsift_mime::encoding::decode_rfc2047_lossy;
use mailsift_mime::{CharsetRegistry, MimePart, MimeReader, PartHeader, ReaderConfig};

use super::model::{Attachment, DATE_FORMAT, SearchResult};
use crate::config::DEFAULT_KEY_HEADER;

/// INTERNALDATE layout (RFC 3501 `date-time`).
const INTERNAL_DATE_FORMAT: &str = "%d-%b-%Y %H:%M:%S %z";

/// What the MIME walk of one message produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    /// Value of the key header, empty if absent.
    pub key: String,
    /// Body text: the last `text/plain` part, else the last `text/html`.
    pub body: String,
    /// Named attachments in message order. Text attachments with a
    /// declared charset hold UTF-8.
    pub attachments: Vec<Attachment>,
}

impl MessageContent {
    /// Returns true if the body or the key contains `needle`. An empty
    /// needle matches everything.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        needle.is_empty() || self.body.contains(needle) || self.key.contains(needle)
    }

    fn fill(self, result: &mut SearchResult) {
        result.key = self.key;
        result.body = self.body;
        result.attachments = self.attachments;
    }
}

/// Builds a fresh [`SearchResult`] per message.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    key_header: String,
    reader: ReaderConfig,
}

impl Default for ResultBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_HEADER)
    }
}

impl ResultBuilder {
    /// Creates a builder reading the key from `key_header`.
    #[must_use]
    pub fn new(key_header: impl Into<String>) -> Self {
        Self {
            key_header: key_header.into(),
            reader: ReaderConfig::new(),
        }
    }

    /// Uses `charsets` for subjects, bodies and filenames.
    #[must_use]
    pub fn with_charsets(mut self, charsets: CharsetRegistry) -> Self {
        self.reader = self.reader.with_charsets(charsets);
        self
    }

    /// Name of the header read into [`SearchResult::key`].
    #[must_use]
    pub fn key_header(&self) -> &str {
        &self.key_header
    }

    /// Projects the envelope-level fields of a fetched message.
    ///
    /// The date comes from INTERNALDATE when fetched, otherwise from the
    /// envelope's Date header.
    #[must_use]
    pub fn basic(&self, message: &Message) -> SearchResult {
        let envelope = message.envelope.as_ref();
        let date = message
            .internal_date
            .as_deref()
            .and_then(parse_internal_date)
            .or_else(|| {
                envelope
                    .and_then(|e| e.date.as_deref())
                    .and_then(parse_header_date)
            });

        SearchResult {
            from: envelope
                .and_then(|e| e.from.first())
                .and_then(Address::email)
                .unwrap_or_default(),
            to_emails: envelope.map(|e| emails(&e.to)).unwrap_or_default(),
            cc_emails: envelope.map(|e| emails(&e.cc)).unwrap_or_default(),
            bcc_emails: envelope.map(|e| emails(&e.bcc)).unwrap_or_default(),
            date: date.map_or(0, |d| d.timestamp()),
            date_str: date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            date_time: date,
            title: self.subject(message),
            size: message.size.unwrap_or(0),
            flags: message.flag_strings(),
            seq_num: message.seq.get(),
            ..SearchResult::default()
        }
    }

    /// Decoded subject of a fetched message, empty if it has none.
    #[must_use]
    pub fn subject(&self, message: &Message) -> String {
        message
            .subject()
            .map(|s| decode_rfc2047_lossy(s, self.reader.charsets()))
            .unwrap_or_default()
    }

    /// Walks the MIME structure of a raw message.
    #[must_use]
    pub fn extract(&self, raw: &[u8]) -> MessageContent {
        let charsets = self.reader.charsets();
        let mut content = MessageContent::default();
        let mut plain = None;
        let mut html = None;

        for part in MimeReader::new(raw, &self.reader) {
            match &part.header {
                PartHeader::Generic(headers) => {
                    content.key = headers
                        .get_decoded(&self.key_header, charsets)
                        .unwrap_or_default();
                }
                PartHeader::Inline(h) if h.content_type.is("text", "html") => {
                    html = Some(text_of(&part, charsets));
                }
                PartHeader::Inline(h) if h.content_type.is_text() => {
                    plain = Some(text_of(&part, charsets));
                }
                PartHeader::Inline(h) => {
                    tracing::debug!(content_type = %h.content_type, "ignoring non-text inline part");
                }
                PartHeader::Attachment(h) => match h.filename.as_deref() {
                    Some(name) if !name.is_empty() => content.attachments.push(Attachment {
                        filename: name.to_string(),
                        data: part.body.clone(),
                    }),
                    _ => {
                        tracing::warn!(
                            content_type = %h.content_type,
                            errors = part.errors().len(),
                            "skipping attachment without a usable filename"
                        );
                    }
                },
            }
        }

        content.body = plain.or(html).unwrap_or_default();
        content
    }

    /// Projects a message together with its MIME content.
    #[must_use]
    pub fn full(&self, message: &Message, raw: &[u8]) -> SearchResult {
        self.assemble(message, self.extract(raw))
    }

    /// Combines envelope fields with already extracted content.
    #[must_use]
    pub fn assemble(&self, message: &Message, content: MessageContent) -> SearchResult {
        let mut result = self.basic(message);
        content.fill(&mut result);
        result
    }
}

fn emails(addresses: &[Address]) -> Vec<String> {
    addresses.iter().filter_map(Address::email).collect()
}

/// Text of an inline part; undecodable text falls back to lossy UTF-8.
fn text_of(part: &MimePart, charsets: &CharsetRegistry) -> String {
    part.text(charsets)
        .unwrap_or_else(|_| String::from_utf8_lossy(&part.body).into_owned())
}

/// Parses `17-Jul-1996 02:44:25 -0700`; the day may be space padded.
fn parse_internal_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), INTERNAL_DATE_FORMAT).ok()
}

/// Parses an RFC 2822 Date header.
fn parse_header_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(s.trim()).ok()
}
