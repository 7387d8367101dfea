//! # mailsift-mime
//!
//! Lazy MIME message reader for email.
//!
//! ## Features
//!
//! - **Lazy part walking**: [`MimeReader`] decodes one part per call,
//!   entering nested multiparts depth-first
//! - **Three part kinds**: the message header, inline bodies and attachments
//!   ([`PartHeader`])
//! - **Transfer decoding**: Base64, Quoted-Printable, 7bit/8bit/binary
//! - **Charsets**: inline text, and text attachments with a declared
//!   charset, are transcoded to UTF-8 through a [`CharsetRegistry`]
//!   carried in [`ReaderConfig`]
//! - **Filenames**: RFC 2231 extended and continued parameters, RFC 2047
//!   encoded words
//!
//! Errors that concern one part are recorded on it
//! ([`MimePart::errors`]); the rest of the message is still read.
//!
//! ## Quick Start
//!
//! ```
//! use mailsift_mime::{MimeReader, PartHeader, ReaderConfig};
//!
//! let raw = b"Subject: report\r\n\
//! Content-Type: multipart/mixed; boundary=sep\r\n\r\n\
//! --sep\r\nContent-Type: text/plain\r\n\r\nsee attached\r\n\
//! --sep\r\nContent-Disposition: attachment; filename=\"data.csv\"\r\n\r\na,b\r\n\
//! --sep--\r\n";
//!
//! let config = ReaderConfig::new();
//! for part in MimeReader::new(raw, &config) {
//!     match &part.header {
//!         PartHeader::Generic(headers) => assert_eq!(headers.get("subject"), Some("report")),
//!         PartHeader::Inline(_) => assert_eq!(part.body, b"see attached"),
//!         PartHeader::Attachment(h) => assert_eq!(h.filename.as_deref(), Some("data.csv")),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod error;
mod header;
mod params;
mod part;
mod reader;

pub mod encoding;

pub use charset::{CharsetRegistry, CustomDecoder};
pub use content_type::{ContentDisposition, ContentType};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
pub use params::Parameters;
pub use part::{AttachmentHeader, InlineHeader, MimePart, PartHeader};
pub use reader::{DEFAULT_MAX_DEPTH, MimeReader, ReaderConfig};
