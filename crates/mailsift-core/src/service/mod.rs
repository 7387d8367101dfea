//! Search services.
//!
//! This module bridges the caller-facing searches with the IMAP session
//! and the MIME reader.

mod search;

pub use search::{Mailsift, recency_range};
