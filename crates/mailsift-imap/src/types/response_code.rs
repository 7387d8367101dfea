//! Response codes carried in `[...]` on status responses.

use super::{Capability, Flag, SeqNum, Uid, UidValidity};

/// Response code from a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: text that must be shown to the user.
    Alert,
    /// CAPABILITY list, usually on the greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// PARSE: the server could not parse a message.
    Parse,
    /// PERMANENTFLAGS: flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: mailbox selected read-only.
    ReadOnly,
    /// READ-WRITE: mailbox selected read-write.
    ReadWrite,
    /// TRYCREATE: the mailbox does not exist.
    TryCreate,
    /// UIDNEXT: next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY of the selected mailbox.
    UidValidity(UidValidity),
    /// UNSEEN: first unseen message.
    Unseen(SeqNum),
    /// Any other code, kept as its atom.
    Other(String),
}

impl ResponseCode {
    /// Returns true for codes the user should see.
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::Alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_alert_is_alert() {
        assert!(ResponseCode::Alert.is_alert());
        assert!(!ResponseCode::ReadOnly.is_alert());
        assert!(!ResponseCode::Other("HIGHESTMODSEQ".into()).is_alert());
    }
}
