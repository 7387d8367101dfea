//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
///
/// None of these stop a [`MimeReader`](crate::MimeReader): errors that
/// concern a single part are recorded on that part
/// ([`MimePart::errors`](crate::MimePart::errors)) and the walk goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid MIME header.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid transfer or header encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// No decoder is registered for this charset.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// An attachment filename parameter could not be decoded.
    #[error("Malformed attachment header: {0}")]
    MalformedAttachmentHeader(String),

    /// Missing boundary in multipart message.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// Invalid multipart structure.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),
}
