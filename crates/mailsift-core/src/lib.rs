//! # mailsift-core
//!
//! Searches an IMAP mailbox and flattens what it finds into
//! [`SearchResult`] records.
//!
//! ## Modules
//!
//! - [`config`]: JSON configuration and its validation
//! - [`result`]: result records and the projector that builds them
//! - [`service`]: the searches themselves
//!
//! ## Example
//!
//! ```ignore
//! use mailsift_core::{MailConfig, Mailsift};
//!
//! let config = MailConfig::from_file("mailsift.json")?;
//! let mailsift = Mailsift::new(config)?;
//! for result in mailsift.search_by_title("invoice").await? {
//!     println!("{} {} ({} attachments)", result.date_str, result.title, result.attachments.len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod result;
pub mod service;

pub use config::{MailConfig, ValidationError};
pub use error::{Error, Result};
pub use result::{Attachment, MessageContent, ResultBuilder, SearchResult};
pub use service::{Mailsift, recency_range};
