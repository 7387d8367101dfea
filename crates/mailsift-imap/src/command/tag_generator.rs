//! Command tag generator.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::Tag;

/// Produces sequential command tags: `A0001`, `A0002`, ...
///
/// The counter starts at 1 and skips 0 when it wraps, so a session never
/// reuses a tag while an earlier command could still be outstanding.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix letter.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(1),
            prefix,
        }
    }

    /// Returns the next tag.
    #[must_use]
    pub fn next(&self) -> Tag {
        let mut n = self.counter.fetch_add(1, Ordering::Relaxed);
        if n == 0 {
            n = self.counter.fetch_add(1, Ordering::Relaxed);
        }
        Tag(format!("{}{:04}", self.prefix, n))
    }

    /// Returns how many tags have been handed out.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.counter.load(Ordering::Relaxed).wrapping_sub(1)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_at_one() {
        let generator = TagGenerator::default();
        assert_eq!(generator.next().as_str(), "A0001");
        assert_eq!(generator.next().as_str(), "A0002");
        assert_eq!(generator.issued(), 2);
    }

    #[test]
    fn custom_prefix() {
        let generator = TagGenerator::new('T');
        assert_eq!(generator.next().as_str(), "T0001");
    }

    #[test]
    fn padding_grows_past_four_digits() {
        let generator = TagGenerator::default();
        generator.counter.store(12_345, Ordering::Relaxed);
        assert_eq!(generator.next().as_str(), "A12345");
    }

    #[test]
    fn wrap_skips_zero() {
        let generator = TagGenerator::default();
        generator.counter.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(generator.next().as_str(), format!("A{}", u32::MAX));
        assert_eq!(generator.next().as_str(), "A0001");
    }

    proptest! {
        #[test]
        fn consecutive_tags_are_distinct(start in 1u32..u32::MAX - 64, count in 2usize..64) {
            let generator = TagGenerator::default();
            generator.counter.store(start, Ordering::Relaxed);
            let tags: std::collections::HashSet<Tag> = (0..count).map(|_| generator.next()).collect();
            prop_assert_eq!(tags.len(), count);
        }
    }
}
