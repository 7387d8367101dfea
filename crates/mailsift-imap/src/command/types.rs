//! Command argument types.

use crate::types::{SequenceSet, UidSet};

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// `ALL` macro: FLAGS INTERNALDATE RFC822.SIZE ENVELOPE.
    All,
    /// `FULL` macro: ALL plus BODY.
    Full,
    /// `FAST` macro: FLAGS INTERNALDATE RFC822.SIZE.
    Fast,
    /// Explicit attribute list.
    Items(Vec<FetchAttribute>),
}

impl FetchItems {
    /// ENVELOPE FLAGS RFC822.SIZE: enough to filter candidates cheaply.
    #[must_use]
    pub fn envelope() -> Self {
        Self::Items(vec![
            FetchAttribute::Envelope,
            FetchAttribute::Flags,
            FetchAttribute::Rfc822Size,
        ])
    }

    /// The whole message without setting `\Seen`.
    #[must_use]
    pub fn full_body() -> Self {
        Self::Items(vec![FetchAttribute::body_peek(None)])
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// Envelope structure.
    Envelope,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier, `None` for the whole message.
        section: Option<String>,
        /// `BODY.PEEK`, leaves `\Seen` alone.
        peek: bool,
        /// Partial fetch `<start.len>`.
        partial: Option<(u32, u32)>,
    },
    /// RFC822 (full message).
    Rfc822,
    /// RFC822.HEADER.
    Rfc822Header,
}

impl FetchAttribute {
    /// `BODY.PEEK[section]`.
    #[must_use]
    pub fn body_peek(section: Option<&str>) -> Self {
        Self::Body {
            section: section.map(str::to_string),
            peek: true,
            partial: None,
        }
    }
}

/// SEARCH criteria.
///
/// The default is [`SearchCriteria::All`], which is also what an omitted
/// criterion means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    #[default]
    All,
    /// Messages with `\Seen`.
    Seen,
    /// Messages without `\Seen`.
    Unseen,
    /// Messages with `\Flagged`.
    Flagged,
    /// Sequence number set.
    SequenceSet(SequenceSet),
    /// UID set.
    UidSet(UidSet),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Body contains text.
    Body(String),
    /// Header or body contains text.
    Text(String),
    /// Internal date on or after, `d-Mon-yyyy`.
    Since(String),
    /// Internal date before, `d-Mon-yyyy`.
    Before(String),
    /// Header field contains value.
    Header(String, String),
    /// All of the criteria.
    And(Vec<Self>),
    /// Either criterion.
    Or(Box<Self>, Box<Self>),
    /// Negation.
    Not(Box<Self>),
}

impl SearchCriteria {
    /// Checks that the criteria can be put on the wire.
    ///
    /// An empty conjunction or an empty set would produce a SEARCH command
    /// with no key, which servers reject.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        match self {
            Self::And(list) if list.is_empty() => Err("empty AND criteria"),
            Self::And(list) => list.iter().try_for_each(Self::validate),
            Self::Or(a, b) => {
                a.validate()?;
                b.validate()
            }
            Self::Not(c) => c.validate(),
            Self::SequenceSet(set) if set.is_empty() => Err("empty sequence set"),
            Self::UidSet(set) if set.is_empty() => Err("empty UID set"),
            _ => Ok(()),
        }
    }
}
