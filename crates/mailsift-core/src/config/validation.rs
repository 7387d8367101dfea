//! Configuration validation.

use super::model::MailConfig;

/// Validation error for a mail configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Server host is empty.
    EmptyHost,
    /// Port is zero.
    InvalidPort,
    /// Username is empty.
    EmptyUsername,
    /// Mailbox name is empty.
    EmptyMailbox,
    /// Key header name is empty or not a valid header name.
    InvalidKeyHeader,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyHost => "IMAP server is required",
            Self::InvalidPort => "IMAP port must be 1-65535",
            Self::EmptyUsername => "IMAP username is required",
            Self::EmptyMailbox => "Mailbox name is required",
            Self::InvalidKeyHeader => "Key header must be a header field name",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
            Self::EmptyUsername => "username",
            Self::EmptyMailbox => "mailbox",
            Self::InvalidKeyHeader => "key_header",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a mail configuration.
///
/// # Errors
///
/// Returns every problem found, not just the first.
pub fn validate_config(config: &MailConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }
    if config.mailbox.trim().is_empty() {
        errors.push(ValidationError::EmptyMailbox);
    }
    if !is_header_name(&config.key_header) {
        errors.push(ValidationError::InvalidKeyHeader);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// RFC 5322 field name: printable ASCII except colon.
fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}
