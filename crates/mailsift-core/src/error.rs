//! Error types for the core library.

use thiserror::Error;

use crate::config::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailsift_imap::Error),

    /// MIME decoding failed.
    #[error("MIME error: {0}")]
    Mime(#[from] mailsift_mime::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        let messages: Vec<&str> = errors.iter().map(ValidationError::message).collect();
        Self::Config(messages.join("; "))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
