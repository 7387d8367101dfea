//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

use crate::types::Status;

/// Errors that can occur during IMAP operations.
///
/// Variants fall into three groups, see [`Error::is_fatal`] and
/// [`Error::is_per_message`]:
///
/// - fatal to the session: the connection can no longer be used;
/// - per-message: one response block could not be decoded, the rest of the
///   batch is still readable;
/// - per-operation: the server refused a command, the session is intact.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Could not establish the TCP/TLS connection.
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connection {
        /// Server host name.
        host: String,
        /// Server port.
        port: u16,
        /// Underlying cause.
        reason: String,
    },

    /// The connection closed underneath an active session.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Protocol parsing error.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A response block was well-framed but its content is unusable.
    #[error("Malformed response{}: {reason}", seq.map(|s| format!(" for message {s}")).unwrap_or_default())]
    MalformedResponse {
        /// Sequence number of the affected message, when known.
        seq: Option<u32>,
        /// Description of the defect.
        reason: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SELECT was refused.
    #[error("Cannot select mailbox {mailbox}: {reason}")]
    Select {
        /// Mailbox that was requested.
        mailbox: String,
        /// Server-provided reason.
        reason: String,
    },

    /// SEARCH was refused.
    #[error("Search failed: {0}")]
    Search(String),

    /// FETCH was refused.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A command was built with arguments the protocol cannot express.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the session cannot be used after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::InvalidDnsName(_)
                | Self::Connection { .. }
                | Self::ConnectionLost(_)
                | Self::Timeout(_)
                | Self::Auth(_)
                | Self::Bye(_)
        )
    }

    /// Returns true if the connection itself is gone or unusable.
    ///
    /// Unlike [`Error::is_fatal`] this excludes [`Error::Auth`]: a refused
    /// login leaves a working, unauthenticated connection.
    #[must_use]
    pub const fn closes_connection(&self) -> bool {
        self.is_fatal() && !matches!(self, Self::Auth(_))
    }

    /// Returns true if the error concerns a single response block.
    #[must_use]
    pub const fn is_per_message(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::MalformedResponse { .. } | Self::Protocol(_)
        )
    }

    /// Attaches a message sequence number to a malformed-response error.
    #[must_use]
    pub fn with_seq(self, seq: u32) -> Self {
        match self {
            Self::MalformedResponse { reason, .. } => Self::MalformedResponse {
                seq: Some(seq),
                reason,
            },
            other => other,
        }
    }

    /// Converts a non-OK completion status into an error.
    pub(crate) fn from_status(status: Status, text: String) -> Self {
        match status {
            Status::No => Self::No(text),
            Status::Bad => Self::Bad(text),
            Status::Bye => Self::Bye(text),
            Status::Ok | Status::PreAuth => {
                Self::Protocol(format!("unexpected {status:?} completion: {text}"))
            }
        }
    }

    /// Replaces a plain NO/BAD refusal with an operation-specific error.
    #[must_use]
    pub(crate) fn refused_as(self, f: impl FnOnce(String) -> Self) -> Self {
        match self {
            Self::No(text) | Self::Bad(text) => f(text),
            other => other,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            seq: None,
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
