//! One message as delivered by a FETCH response.

use std::collections::BTreeMap;

use crate::parser::{Address, Envelope, FetchItem};
use crate::types::{Flags, SeqNum, Uid};

/// Data for one message, built from a single `* n FETCH (...)` block.
///
/// Only the items the server actually sent are present. Body sections are
/// keyed by their section name; the whole message (`BODY[]`, `RFC822`) is
/// stored under the empty name. A section the server sent as `NIL` is not
/// stored, so it stays distinct from an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message sequence number.
    pub seq: SeqNum,
    /// UID, if fetched.
    pub uid: Option<Uid>,
    /// RFC822.SIZE, if fetched.
    pub size: Option<u32>,
    /// Flags; empty if not fetched.
    pub flags: Flags,
    /// Envelope, if fetched.
    pub envelope: Option<Envelope>,
    /// INTERNALDATE as sent by the server.
    pub internal_date: Option<String>,
    /// Body sections by name.
    pub sections: BTreeMap<String, Vec<u8>>,
}

impl Message {
    /// Collects the items of one FETCH block.
    ///
    /// When an item occurs twice the later one wins.
    #[must_use]
    pub fn from_fetch(seq: SeqNum, items: Vec<FetchItem>) -> Self {
        let mut message = Self {
            seq,
            uid: None,
            size: None,
            flags: Flags::new(),
            envelope: None,
            internal_date: None,
            sections: BTreeMap::new(),
        };

        for item in items {
            match item {
                FetchItem::Flags(flags) => message.flags = flags,
                FetchItem::InternalDate(date) => message.internal_date = Some(date),
                FetchItem::Rfc822Size(size) => message.size = Some(size),
                FetchItem::Envelope(envelope) => message.envelope = Some(*envelope),
                FetchItem::Uid(uid) => message.uid = Some(uid),
                FetchItem::Section {
                    name,
                    data: Some(data),
                    ..
                } => {
                    message.sections.insert(name, data);
                }
                FetchItem::Section { name, data: None, .. } => {
                    message.sections.remove(&name);
                }
            }
        }

        message
    }

    /// Returns the raw subject from the envelope.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.envelope.as_ref()?.subject.as_deref()
    }

    /// Returns the first sender address.
    #[must_use]
    pub fn from_address(&self) -> Option<String> {
        self.envelope.as_ref()?.from.first().and_then(Address::email)
    }

    /// Returns the flags as their wire strings (`\Seen`, `$Forwarded`, ...).
    #[must_use]
    pub fn flag_strings(&self) -> Vec<String> {
        self.flags.to_strings()
    }

    /// Returns the bytes of a body section.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&[u8]> {
        self.sections.get(name).map(Vec::as_slice)
    }

    /// Returns the whole raw message, if `BODY[]` or `RFC822` was fetched.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.section("")
    }

    /// Takes the whole raw message out of the message.
    #[must_use]
    pub fn into_body(mut self) -> Option<Vec<u8>> {
        self.sections.remove("")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[test]
    fn collects_items() {
        let mut flags = Flags::new();
        flags.insert(Flag::Seen);
        let envelope = Envelope {
            subject: Some("hello".into()),
            from: vec![Address {
                name: None,
                adl: None,
                mailbox: Some("a".into()),
                host: Some("x.com".into()),
            }],
            ..Envelope::default()
        };

        let message = Message::from_fetch(
            seq(3),
            vec![
                FetchItem::Uid(Uid::new(42).unwrap()),
                FetchItem::Flags(flags),
                FetchItem::Rfc822Size(1200),
                FetchItem::Envelope(Box::new(envelope)),
            ],
        );

        assert_eq!(message.seq.get(), 3);
        assert_eq!(message.uid.map(Uid::get), Some(42));
        assert_eq!(message.size, Some(1200));
        assert_eq!(message.subject(), Some("hello"));
        assert_eq!(message.from_address().as_deref(), Some("a@x.com"));
        assert_eq!(message.flag_strings(), vec!["\\Seen"]);
        assert!(message.body().is_none());
    }

    #[test]
    fn sections_by_name() {
        let message = Message::from_fetch(
            seq(1),
            vec![
                FetchItem::Section {
                    name: String::new(),
                    origin: None,
                    data: Some(b"Subject: x\r\n\r\nbody".to_vec()),
                },
                FetchItem::Section {
                    name: "HEADER".into(),
                    origin: None,
                    data: None,
                },
                FetchItem::Section {
                    name: "TEXT".into(),
                    origin: None,
                    data: Some(Vec::new()),
                },
            ],
        );

        assert_eq!(message.body(), Some(&b"Subject: x\r\n\r\nbody"[..]));
        assert_eq!(message.section("HEADER"), None);
        assert_eq!(message.section("TEXT"), Some(&b""[..]));
        assert_eq!(message.into_body().unwrap().len(), 18);
    }
}
