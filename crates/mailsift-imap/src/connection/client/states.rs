//! Type-state markers for IMAP client connection states.
//!
//! `Selected` is not a bare marker: it carries what the server reported
//! when the mailbox was selected.

use crate::types::MailboxInfo;

/// Marker type for the not-authenticated state.
///
/// Only LOGIN and LOGOUT are valid here.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// SELECT and LOGOUT are valid here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) info: MailboxInfo,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub const fn new(info: MailboxInfo) -> Self {
        Self { info }
    }

    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.info.name
    }

    /// Returns the metadata reported by SELECT, kept current by EXISTS.
    #[must_use]
    pub const fn info(&self) -> &MailboxInfo {
        &self.info
    }

    /// Returns the number of messages in the mailbox.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.info.exists
    }

    /// Returns the UID validity value.
    #[must_use]
    pub fn uid_validity(&self) -> Option<u32> {
        self.info.uid_validity.map(crate::types::UidValidity::get)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::used_underscore_items)]
mod tests {
    use super::*;
    use crate::types::UidValidity;

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_state_accessors() {
        let info = MailboxInfo {
            exists: 100,
            recent: 5,
            uid_validity: UidValidity::new(12345),
            ..MailboxInfo::new("INBOX")
        };
        let selected = Selected::new(info);

        assert_eq!(selected.mailbox(), "INBOX");
        assert_eq!(selected.exists(), 100);
        assert_eq!(selected.info().recent, 5);
        assert_eq!(selected.uid_validity(), Some(12345));
    }
}
