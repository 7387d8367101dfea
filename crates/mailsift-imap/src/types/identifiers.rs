//! Command tags and message identifiers.

use std::fmt;
use std::num::NonZeroU32;

/// IMAP command tag.
///
/// Every command carries a tag and the server echoes it on the completion
/// line, which is how replies are matched to requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a new tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! nonzero_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Wraps `n`, or returns `None` for zero.
            #[must_use]
            pub const fn new(n: u32) -> Option<Self> {
                match NonZeroU32::new(n) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }

            /// Returns the underlying value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

nonzero_id!(
    /// Message sequence number.
    ///
    /// Numbered from 1 in mailbox order; they shift when messages are
    /// expunged.
    SeqNum
);

nonzero_id!(
    /// Unique identifier of a message within a mailbox.
    Uid
);

nonzero_id!(
    /// UIDVALIDITY value for a mailbox. A change invalidates all known UIDs.
    UidValidity
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tag_display() {
        let tag = Tag::new("A0001");
        assert_eq!(tag.as_str(), "A0001");
        assert_eq!(format!("{tag}"), "A0001");
    }

    #[test]
    fn zero_is_not_an_identifier() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
    }

    #[test]
    fn round_trips_value() {
        assert_eq!(SeqNum::new(42).unwrap().get(), 42);
        assert_eq!(Uid::new(u32::MAX).unwrap().get(), u32::MAX);
        assert_eq!(UidValidity::new(3_857_529_045).unwrap().to_string(), "3857529045");
    }

    #[test]
    fn seq_nums_order_numerically() {
        let mut nums: Vec<SeqNum> = [9, 2, 5].into_iter().filter_map(SeqNum::new).collect();
        nums.sort();
        let raw: Vec<u32> = nums.into_iter().map(SeqNum::get).collect();
        assert_eq!(raw, vec![2, 5, 9]);
    }
}
