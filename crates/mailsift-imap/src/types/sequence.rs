//! Sequence sets for message ranges.
//!
//! A set is an ordered list of single numbers, inclusive ranges and the `*`
//! wildcard, rendered as `1,3:5,9:*`. Sequence-number sets and UID sets share
//! one implementation but are distinct types, so a UID can never end up in a
//! command that expects sequence numbers.

use std::fmt;
use std::marker::PhantomData;

use super::{SeqNum, Uid};

/// One element of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Single(u32),
    Range(u32, u32),
    RangeFrom(u32),
    Star,
}

impl Item {
    const fn contains(self, n: u32) -> bool {
        match self {
            Self::Single(v) => v == n,
            Self::Range(lo, hi) => lo <= n && n <= hi,
            Self::RangeFrom(lo) => n >= lo,
            Self::Star => false,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(lo, hi) => write!(f, "{lo}:{hi}"),
            Self::RangeFrom(lo) => write!(f, "{lo}:*"),
            Self::Star => f.write_str("*"),
        }
    }
}

/// Marker for sets of message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {}

/// Marker for sets of UIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidKind {}

/// Ordered set of message numbers, parameterised by what the numbers mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberSet<K> {
    items: Vec<Item>,
    _kind: PhantomData<K>,
}

/// Set of message sequence numbers.
pub type SequenceSet = NumberSet<SeqKind>;

/// Set of message UIDs.
pub type UidSet = NumberSet<UidKind>;

impl<K> Default for NumberSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> NumberSet<K> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Creates a set matching every message (`1:*`).
    #[must_use]
    pub fn all() -> Self {
        let mut set = Self::new();
        set.add_range_from(1);
        set
    }

    /// Creates a set holding a single number, or `None` for zero.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        let mut set = Self::new();
        set.add_num(n);
        (!set.is_empty()).then_some(set)
    }

    /// Creates a set holding `lo..=hi`, or `None` if the range is empty.
    #[must_use]
    pub fn range(lo: u32, hi: u32) -> Option<Self> {
        let mut set = Self::new();
        set.add_range(lo, hi);
        (!set.is_empty()).then_some(set)
    }

    /// Adds one number. Zero is not a message number and is ignored.
    pub fn add_num(&mut self, n: u32) {
        if n > 0 {
            self.items.push(Item::Single(n));
        }
    }

    /// Adds the inclusive range `lo..=hi`.
    ///
    /// `lo` is clamped to 1. If `hi < lo` afterwards nothing is added.
    pub fn add_range(&mut self, lo: u32, hi: u32) {
        let lo = lo.max(1);
        if hi < lo {
            return;
        }
        if lo == hi {
            self.items.push(Item::Single(lo));
        } else {
            self.items.push(Item::Range(lo, hi));
        }
    }

    /// Adds `lo:*`, every message from `lo` to the highest one.
    pub fn add_range_from(&mut self, lo: u32) {
        self.items.push(Item::RangeFrom(lo.max(1)));
    }

    /// Adds the `*` wildcard, the highest message in the mailbox.
    pub fn add_all(&mut self) {
        self.items.push(Item::Star);
    }

    /// Returns true if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if `n` is covered by a concrete element of the set.
    ///
    /// The bare `*` wildcard depends on the mailbox size and never matches.
    #[must_use]
    pub fn contains(&self, n: u32) -> bool {
        self.items.iter().any(|item| item.contains(n))
    }

    /// Expands the set into individual numbers, in insertion order.
    ///
    /// Open-ended elements (`*`, `n:*`) are resolved against `highest`.
    pub fn iter_numbers(&self, highest: u32) -> impl Iterator<Item = u32> + '_ {
        self.items.iter().flat_map(move |item| match *item {
            Item::Single(n) => n..=n,
            Item::Range(lo, hi) => lo..=hi,
            Item::RangeFrom(lo) => lo..=highest,
            Item::Star => highest.max(1)..=highest,
        })
    }
}

impl<K> fmt::Display for NumberSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl FromIterator<SeqNum> for SequenceSet {
    fn from_iter<I: IntoIterator<Item = SeqNum>>(iter: I) -> Self {
        let mut set = Self::new();
        for n in iter {
            set.add_num(n.get());
        }
        set
    }
}

impl FromIterator<Uid> for UidSet {
    fn from_iter<I: IntoIterator<Item = Uid>>(iter: I) -> Self {
        let mut set = Self::new();
        for n in iter {
            set.add_num(n.get());
        }
        set
    }
}

impl From<SeqNum> for SequenceSet {
    fn from(n: SeqNum) -> Self {
        let mut set = Self::new();
        set.add_num(n.get());
        set
    }
}

impl From<Uid> for UidSet {
    fn from(uid: Uid) -> Self {
        let mut set = Self::new();
        set.add_num(uid.get());
        set
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::unreadable_literal
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_renders_nothing() {
        let set = SequenceSet::new();
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "");
    }

    #[test]
    fn mixed_elements_render_in_order() {
        let mut set = SequenceSet::new();
        set.add_num(1);
        set.add_range(3, 5);
        set.add_range_from(9);
        set.add_all();
        assert_eq!(set.to_string(), "1,3:5,9:*,*");
    }

    #[test]
    fn degenerate_range_renders_single() {
        let set = SequenceSet::range(4, 4).unwrap();
        assert_eq!(set.to_string(), "4");
    }

    #[test]
    fn zero_is_ignored() {
        assert!(SequenceSet::single(0).is_none());
        let mut set = UidSet::new();
        set.add_num(0);
        assert!(set.is_empty());
    }

    #[test]
    fn range_low_end_clamps_to_one() {
        let set = SequenceSet::range(0, 3).unwrap();
        assert_eq!(set.to_string(), "1:3");
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(SequenceSet::range(10, 5).is_none());
        // empty mailbox: [n, 0]
        assert!(SequenceSet::range(10, 0).is_none());
        assert!(SequenceSet::range(0, 0).is_none());
    }

    #[test]
    fn all_is_one_to_star() {
        assert_eq!(SequenceSet::all().to_string(), "1:*");
    }

    #[test]
    fn contains_ignores_bare_star() {
        let mut set = SequenceSet::new();
        set.add_range(2, 4);
        set.add_all();
        assert!(set.contains(3));
        assert!(!set.contains(1));
        assert!(!set.contains(100));
    }

    #[test]
    fn iter_numbers_resolves_open_ends() {
        let mut set = SequenceSet::new();
        set.add_num(1);
        set.add_range_from(5);
        set.add_all();
        let nums: Vec<u32> = set.iter_numbers(7).collect();
        assert_eq!(nums, vec![1, 5, 6, 7, 7]);
    }

    #[test]
    fn collects_from_seq_nums() {
        let set: SequenceSet = [3, 1, 2]
            .into_iter()
            .filter_map(SeqNum::new)
            .collect();
        assert_eq!(set.to_string(), "3,1,2");
    }

    #[test]
    fn uid_set_from_uid() {
        let set = UidSet::from(Uid::new(42).unwrap());
        assert_eq!(set.to_string(), "42");
    }

    /// Reads a rendered set back into the numbers it names.
    fn expand(rendered: &str) -> Vec<u32> {
        rendered
            .split(',')
            .filter(|part| !part.is_empty())
            .flat_map(|part| match part.split_once(':') {
                Some((lo, hi)) => {
                    let (lo, hi): (u32, u32) = (lo.parse().unwrap(), hi.parse().unwrap());
                    (lo..=hi).collect::<Vec<_>>()
                }
                None => vec![part.parse().unwrap()],
            })
            .collect()
    }

    proptest! {
        #[test]
        fn range_expands_to_exactly_lo_hi(lo in 1u32..500, len in 0u32..200) {
            let hi = lo + len;
            let mut set = SequenceSet::new();
            set.add_range(lo, hi);
            let expected: Vec<u32> = (lo..=hi).collect();
            prop_assert_eq!(expand(&set.to_string()), expected.clone());
            let nums: Vec<u32> = set.iter_numbers(u32::MAX).collect();
            prop_assert_eq!(nums, expected);
        }

        #[test]
        fn rendered_ranges_name_every_member(
            ranges in proptest::collection::vec((1u32..300, 0u32..50), 1..6),
        ) {
            let mut set = SequenceSet::new();
            let mut expected = Vec::new();
            for (lo, len) in &ranges {
                set.add_range(*lo, lo + len);
                expected.extend(*lo..=lo + len);
            }
            prop_assert_eq!(expand(&set.to_string()), expected);
        }

        #[test]
        fn inverted_range_adds_nothing(hi in 0u32..500, gap in 1u32..500) {
            let lo = hi + gap;
            let mut set = SequenceSet::new();
            set.add_range(lo, hi);
            prop_assert!(set.is_empty());
            prop_assert_eq!(set.to_string(), "");
        }

        #[test]
        fn rendered_set_has_no_zero(nums in proptest::collection::vec(0u32..50, 0..20)) {
            let mut set = UidSet::new();
            for n in &nums {
                set.add_num(*n);
            }
            let rendered = set.to_string();
            prop_assert!(rendered.split(',').all(|p| p != "0"));
        }
    }
}
