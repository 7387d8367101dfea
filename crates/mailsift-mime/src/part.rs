//! MIME parts produced by the reader.

use crate::charset::CharsetRegistry;
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use crate::header::Headers;

/// Header of an inline part: a body meant to be displayed.
#[derive(Debug, Clone)]
pub struct InlineHeader {
    /// Raw part headers.
    pub headers: Headers,
    /// Effective content type (the default when absent or invalid).
    pub content_type: ContentType,
    /// Transfer encoding that was removed from the body.
    pub transfer_encoding: TransferEncoding,
}

/// Header of an attachment part.
#[derive(Debug, Clone)]
pub struct AttachmentHeader {
    /// Raw part headers.
    pub headers: Headers,
    /// Effective content type (the default when absent or invalid).
    pub content_type: ContentType,
    /// Content-Disposition, if the part had one.
    pub disposition: Option<ContentDisposition>,
    /// Decoded filename. `None` if the part has no filename or it could not
    /// be decoded (the part then carries a
    /// [`Error::MalformedAttachmentHeader`]).
    pub filename: Option<String>,
    /// Transfer encoding that was removed from the body.
    pub transfer_encoding: TransferEncoding,
}

/// Header of a [`MimePart`].
#[derive(Debug, Clone)]
pub enum PartHeader {
    /// The top-level message header. Comes first and has an empty body.
    Generic(Headers),
    /// An inline body part.
    Inline(InlineHeader),
    /// An attachment.
    Attachment(AttachmentHeader),
}

impl PartHeader {
    /// Raw headers of the part.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Generic(headers) => headers,
            Self::Inline(h) => &h.headers,
            Self::Attachment(h) => &h.headers,
        }
    }

    /// Content type of a body part, `None` for the message header.
    #[must_use]
    pub const fn content_type(&self) -> Option<&ContentType> {
        match self {
            Self::Generic(_) => None,
            Self::Inline(h) => Some(&h.content_type),
            Self::Attachment(h) => Some(&h.content_type),
        }
    }

    /// Decoded attachment filename.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Attachment(h) => h.filename.as_deref(),
            Self::Generic(_) | Self::Inline(_) => None,
        }
    }
}

/// One part of a message.
///
/// The body has its transfer encoding removed. Inline text, and text
/// attachments that declare a charset, are also transcoded to UTF-8 when
/// the charset is known. Other attachment bytes are left as sent.
#[derive(Debug, Clone)]
pub struct MimePart {
    /// Part header.
    pub header: PartHeader,
    /// Decoded body.
    pub body: Vec<u8>,
    errors: Vec<Error>,
    transcoded: bool,
}

impl MimePart {
    pub(crate) const fn generic(headers: Headers) -> Self {
        Self {
            header: PartHeader::Generic(headers),
            body: Vec::new(),
            errors: Vec::new(),
            transcoded: true,
        }
    }

    /// Builds a leaf part from its headers and still-encoded body.
    pub(crate) fn build(
        headers: Headers,
        raw_body: &[u8],
        default_type: &ContentType,
        charsets: &CharsetRegistry,
    ) -> Self {
        let mut errors = Vec::new();

        let content_type = match headers.get("content-type").map(ContentType::parse) {
            Some(Ok(ct)) => ct,
            Some(Err(e)) => {
                errors.push(e);
                default_type.clone()
            }
            None => default_type.clone(),
        };
        let disposition = headers
            .get("content-disposition")
            .map(ContentDisposition::parse);
        let transfer_encoding = headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);

        let named = disposition
            .as_ref()
            .is_some_and(|d| d.parameters.has("filename"))
            || content_type.parameters.has("name");
        let is_attachment = named || disposition.as_ref().is_some_and(ContentDisposition::is_attachment);

        let body = transfer_encoding.decode(raw_body).unwrap_or_else(|e| {
            errors.push(e);
            raw_body.to_vec()
        });

        let transcode =
            content_type.is_text() && (!is_attachment || content_type.charset().is_some());
        let (body, transcoded) = if transcode {
            let charset = content_type.charset().unwrap_or("us-ascii");
            match charsets.decode(charset, &body) {
                Ok(text) => (text.into_bytes(), true),
                Err(e) => {
                    errors.push(e);
                    (body, false)
                }
            }
        } else {
            (body, false)
        };

        if is_attachment {
            let filename = match filename(disposition.as_ref(), &content_type, charsets) {
                Ok(name) => name,
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            return Self {
                header: PartHeader::Attachment(AttachmentHeader {
                    headers,
                    content_type,
                    disposition,
                    filename,
                    transfer_encoding,
                }),
                body,
                errors,
                transcoded,
            };
        }

        Self {
            header: PartHeader::Inline(InlineHeader {
                headers,
                content_type,
                transfer_encoding,
            }),
            body,
            errors,
            transcoded,
        }
    }

    pub(crate) fn record(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Problems met while decoding this part. The part is still usable:
    /// a body whose decoding failed is kept as received.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Returns true for an inline text part.
    #[must_use]
    pub fn is_inline_text(&self) -> bool {
        matches!(&self.header, PartHeader::Inline(h) if h.content_type.is_text())
    }

    /// Decodes the body as text using the part's charset.
    ///
    /// Inline text that was already transcoded is returned as is; other
    /// parts (attachments included) are decoded on request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if the registry cannot decode
    /// the part's charset.
    pub fn text(&self, charsets: &CharsetRegistry) -> Result<String> {
        if self.transcoded {
            return Ok(String::from_utf8_lossy(&self.body).into_owned());
        }
        let charset = self
            .header
            .content_type()
            .and_then(ContentType::charset)
            .unwrap_or("utf-8");
        charsets.decode(charset, &self.body)
    }

    /// Consumes the part, returning the decoded body.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Disposition `filename` first, then the Content-Type `name` parameter.
fn filename(
    disposition: Option<&ContentDisposition>,
    content_type: &ContentType,
    charsets: &CharsetRegistry,
) -> Result<Option<String>> {
    if let Some(d) = disposition
        && d.parameters.has("filename")
    {
        return d.parameters.decoded("filename", charsets);
    }
    content_type.parameters.decoded("name", charsets)
}
