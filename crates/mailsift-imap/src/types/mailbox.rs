//! Mailbox names and selection metadata.

use std::fmt;

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the server reported while selecting a mailbox.
#[derive(Debug, Clone, Default)]
pub struct MailboxInfo {
    /// Selected mailbox name.
    pub name: String,
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// First unseen message sequence number.
    pub unseen: Option<SeqNum>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be permanently stored.
    pub permanent_flags: Flags,
    /// Whether the mailbox is read-only.
    pub read_only: bool,
}

impl MailboxInfo {
    /// Creates empty metadata for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns true if the mailbox holds no messages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.exists == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_name() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
        assert_eq!(Mailbox::new("Sent").to_string(), "Sent");
    }

    #[test]
    fn new_info_is_empty() {
        let info = MailboxInfo::new("INBOX");
        assert_eq!(info.name, "INBOX");
        assert!(info.is_empty());
        assert!(info.uid_validity.is_none());
    }
}
