//! Core IMAP types.
//!
//! Identifiers, flags, capabilities, response codes, mailbox metadata and
//! sequence sets as defined by RFC 3501.

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{Mailbox, MailboxInfo};
pub use response_code::ResponseCode;
pub use sequence::{NumberSet, SeqKind, SequenceSet, UidKind, UidSet};
