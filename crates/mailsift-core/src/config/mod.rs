//! Configuration loading and validation.
//!
//! The configuration is a JSON file with the server address, credentials
//! and the search defaults.

mod model;
mod validation;

pub use model::{DEFAULT_KEY_HEADER, DEFAULT_MAILBOX, MailConfig};
pub use validation::{ValidationError, ValidationResult, validate_config};
