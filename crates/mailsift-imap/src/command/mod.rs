//! IMAP command builder.
//!
//! [`Command`] is the typed form of every request this client sends. Each
//! variant knows its wire form and which untagged data it solicits; anything
//! else the server emits while the command is in flight is unsolicited.

mod serialize;
mod tag_generator;
mod types;

use crate::error::{Error, Result};
use crate::parser::ResponseKind;
use crate::types::{Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchCriteria};

use serialize::{LineWriter, write_fetch_items, write_search_criteria};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// SEARCH command.
    Search {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// FETCH command.
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Items to fetch.
        items: FetchItems,
    },
    /// LOGOUT command.
    Logout,
    /// IDLE command (RFC 2177).
    Idle,
    /// DONE, ends IDLE. Sent without a tag.
    Done,
    /// UNSELECT command (RFC 3691).
    Unselect,
}

impl Command {
    /// Builds a SEARCH; no criteria means `ALL`.
    #[must_use]
    pub fn search(criteria: Option<SearchCriteria>) -> Self {
        Self::Search {
            criteria: criteria.unwrap_or_default(),
        }
    }

    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Search { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Logout => "LOGOUT",
            Self::Idle => "IDLE",
            Self::Done => "DONE",
            Self::Unselect => "UNSELECT",
        }
    }

    /// Untagged data this command solicits.
    ///
    /// Any other untagged response seen before the completion is routed to
    /// the session's event sink.
    #[must_use]
    pub const fn expected_responses(&self) -> &'static [ResponseKind] {
        match self {
            Self::Capability | Self::Login { .. } => &[ResponseKind::Capability],
            Self::Select { .. } => &[
                ResponseKind::Exists,
                ResponseKind::Recent,
                ResponseKind::Flags,
                ResponseKind::Status,
            ],
            Self::Search { .. } => &[ResponseKind::Search],
            Self::Fetch { .. } => &[ResponseKind::Fetch],
            Self::Logout => &[ResponseKind::Bye],
            Self::Noop | Self::Idle | Self::Done | Self::Unselect => &[],
        }
    }

    /// Returns true if `kind` is solicited by this command.
    #[must_use]
    pub fn expects(&self, kind: ResponseKind) -> bool {
        self.expected_responses().contains(&kind)
    }

    /// Returns true if the command line must not be logged verbatim.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Login { .. })
    }

    /// Rejects arguments that cannot be expressed on the wire.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCommand` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let problem = match self {
            Self::Login { username, .. } if username.is_empty() => Some("empty username"),
            Self::Select { mailbox } if mailbox.as_str().is_empty() => Some("empty mailbox name"),
            Self::Search { criteria } => criteria.validate().err(),
            Self::Fetch { sequence, .. } if sequence.is_empty() => Some("empty sequence set"),
            Self::Fetch {
                items: FetchItems::Items(attrs),
                ..
            } if attrs.is_empty() => Some("no fetch attributes"),
            _ => None,
        };
        problem.map_or(Ok(()), |p| {
            Err(Error::InvalidCommand(format!("{}: {p}", self.name())))
        })
    }

    /// Encodes the command with the given tag.
    #[must_use]
    pub fn encode(&self, tag: &str) -> EncodedCommand {
        let mut w = LineWriter::default();

        if !matches!(self, Self::Done) {
            w.raw(tag.as_bytes());
            w.push(b' ');
        }
        w.raw(self.name().as_bytes());

        match self {
            Self::Login { username, password } => {
                w.push(b' ');
                w.astring(username);
                w.push(b' ');
                w.astring(password);
            }
            Self::Select { mailbox } => {
                w.push(b' ');
                w.astring(mailbox.as_str());
            }
            Self::Search { criteria } => {
                w.push(b' ');
                write_search_criteria(&mut w, criteria);
            }
            Self::Fetch { sequence, items } => {
                w.push(b' ');
                w.raw(sequence.to_string().as_bytes());
                w.push(b' ');
                write_fetch_items(&mut w, items);
            }
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::Idle
            | Self::Done
            | Self::Unselect => {}
        }
        w.finish()
    }

    /// Encodes the command into one contiguous buffer, literals inline.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        self.encode(tag).into_bytes()
    }
}

/// A command ready for the wire.
///
/// Segments after the first each begin with the bytes of a synchronizing
/// literal; the server's `+` continuation must be read before each of them
/// is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    segments: Vec<Vec<u8>>,
}

impl EncodedCommand {
    /// Returns the wire segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// Returns true if sending requires continuation round trips.
    #[must_use]
    pub fn has_literals(&self) -> bool {
        self.segments.len() > 1
    }

    /// Concatenates all segments.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.segments.concat()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::parser::{Response, ResponseParser};
    use crate::types::SeqNum;

    #[test]
    fn capability_command() {
        assert_eq!(Command::Capability.serialize("A0001"), b"A0001 CAPABILITY\r\n");
    }

    #[test]
    fn login_plain() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(cmd.serialize("A0001"), b"A0001 LOGIN user pass\r\n");
    }

    #[test]
    fn login_quotes_specials() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word\"x".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0001"),
            b"A0001 LOGIN user@example.com \"pass word\\\"x\"\r\n"
        );
    }

    #[test]
    fn login_password_with_eight_bit_is_literal() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pässwort".to_string(),
        };
        let encoded = cmd.encode("A0002");
        assert!(encoded.has_literals());
        assert_eq!(encoded.segments()[0], b"A0002 LOGIN user {9}\r\n");
        assert_eq!(encoded.segments()[1], "pässwort\r\n".as_bytes());
    }

    #[test]
    fn select_mailbox_with_space() {
        let cmd = Command::Select {
            mailbox: Mailbox::new("Sent Items"),
        };
        assert_eq!(cmd.serialize("A0003"), b"A0003 SELECT \"Sent Items\"\r\n");
    }

    #[test]
    fn search_without_criteria_is_all() {
        let implicit = Command::search(None);
        let explicit = Command::search(Some(SearchCriteria::All));
        assert_eq!(implicit, explicit);
        assert_eq!(implicit.serialize("A0004"), b"A0004 SEARCH ALL\r\n");
        assert_eq!(implicit.serialize("A0004"), explicit.serialize("A0004"));
    }

    #[test]
    fn search_composition() {
        let cmd = Command::search(Some(SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Or(
                Box::new(SearchCriteria::From("alice".into())),
                Box::new(SearchCriteria::And(vec![
                    SearchCriteria::Subject("weekly report".into()),
                    SearchCriteria::Since("1-Feb-2024".into()),
                ])),
            ),
            SearchCriteria::Not(Box::new(SearchCriteria::Header(
                "X-Spam".into(),
                "yes".into(),
            ))),
        ])));
        assert_eq!(
            cmd.serialize("A0005"),
            b"A0005 SEARCH UNSEEN OR FROM alice (SUBJECT \"weekly report\" SINCE 1-Feb-2024) NOT HEADER X-Spam yes\r\n".to_vec()
        );
    }

    #[test]
    fn search_with_sets() {
        let cmd = Command::search(Some(SearchCriteria::SequenceSet(
            SequenceSet::range(1, 10).unwrap(),
        )));
        assert_eq!(cmd.serialize("A0006"), b"A0006 SEARCH 1:10\r\n");
    }

    #[test]
    fn fetch_envelope_items() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::range(1, 10).unwrap(),
            items: FetchItems::envelope(),
        };
        assert_eq!(
            cmd.serialize("A0007"),
            b"A0007 FETCH 1:10 (ENVELOPE FLAGS RFC822.SIZE)\r\n"
        );
    }

    #[test]
    fn fetch_body_peek_partial() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::single(3).unwrap(),
            items: FetchItems::Items(vec![FetchAttribute::Body {
                section: Some("HEADER".into()),
                peek: true,
                partial: Some((0, 1024)),
            }]),
        };
        assert_eq!(
            cmd.serialize("A0008"),
            b"A0008 FETCH 3 BODY.PEEK[HEADER]<0.1024>\r\n"
        );
    }

    #[test]
    fn fetch_macros() {
        let set = SequenceSet::all();
        for (items, word) in [
            (FetchItems::All, "ALL"),
            (FetchItems::Fast, "FAST"),
            (FetchItems::Full, "FULL"),
        ] {
            let cmd = Command::Fetch {
                sequence: set.clone(),
                items,
            };
            assert_eq!(
                cmd.serialize("A0009"),
                format!("A0009 FETCH 1:* {word}\r\n").into_bytes()
            );
        }
    }

    #[test]
    fn argumentless_commands() {
        assert_eq!(Command::Logout.serialize("A0010"), b"A0010 LOGOUT\r\n");
        assert_eq!(Command::Idle.serialize("A0011"), b"A0011 IDLE\r\n");
        assert_eq!(Command::Unselect.serialize("A0012"), b"A0012 UNSELECT\r\n");
        assert_eq!(Command::Noop.serialize("A0013"), b"A0013 NOOP\r\n");
        assert_eq!(Command::Done.serialize("ignored"), b"DONE\r\n");
    }

    #[test]
    fn validate_rejects_empty_arguments() {
        let empty_fetch = Command::Fetch {
            sequence: SequenceSet::new(),
            items: FetchItems::Fast,
        };
        assert!(matches!(
            empty_fetch.validate(),
            Err(Error::InvalidCommand(msg)) if msg == "FETCH: empty sequence set"
        ));
        let empty_and = Command::search(Some(SearchCriteria::And(Vec::new())));
        assert!(empty_and.validate().is_err());
        assert!(Command::search(None).validate().is_ok());
    }

    #[test]
    fn expected_responses_by_command() {
        assert!(Command::search(None).expects(ResponseKind::Search));
        assert!(!Command::search(None).expects(ResponseKind::Exists));
        assert!(Command::Logout.expects(ResponseKind::Bye));
        assert!(
            Command::Select {
                mailbox: Mailbox::inbox()
            }
            .expects(ResponseKind::Exists)
        );
        assert!(Command::Idle.expected_responses().is_empty());
    }

    #[test]
    fn tag_round_trips_through_reply() {
        let generator = TagGenerator::default();
        let tag = generator.next();
        let wire = Command::Noop.serialize(tag.as_str());
        assert!(wire.starts_with(tag.as_str().as_bytes()));

        let reply = format!("{tag} OK NOOP completed\r\n");
        match ResponseParser::parse(reply.as_bytes()).unwrap() {
            Response::Tagged { tag: got, .. } => assert_eq!(got, tag),
            other => panic!("expected tagged reply, got {other:?}"),
        }
    }

    #[test]
    fn fetch_from_seq_nums() {
        let set: SequenceSet = [SeqNum::new(4).unwrap(), SeqNum::new(2).unwrap()]
            .into_iter()
            .collect();
        let cmd = Command::Fetch {
            sequence: set,
            items: FetchItems::full_body(),
        };
        assert_eq!(cmd.serialize("A0014"), b"A0014 FETCH 4,2 BODY.PEEK[]\r\n");
    }
}
