//! Byte ranges for physical key range queries.

use bytes::Bytes;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::ops::{Bound, RangeBounds};

/// A range over byte sequences, used for key range queries.
///
/// Bounds compare byte-wise, which for UTF-8 encoded keys is the same
/// order as comparing the strings by code point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, k: &[u8]) -> bool {
        (match &self.start {
            Included(s) => k >= s,
            Excluded(s) => k > s,
            Unbounded => true,
        }) && (match &self.end {
            Included(e) => k <= e,
            Excluded(e) => k < e,
            Unbounded => true,
        })
    }

    /// Returns true if the bounds are inverted or meet at an excluded key.
    ///
    /// `BTreeMap::range` panics on inverted ranges, so backends check first.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Unbounded, _) | (_, Unbounded) => false,
            (Included(s), Included(e)) => s > e,
            (Included(s), Excluded(e)) | (Excluded(s), Included(e)) => s >= e,
            (Excluded(s), Excluded(e)) => s >= e,
        }
    }

    /// Creates a range that scans everything.
    pub fn unbounded() -> Self {
        Self {
            start: Unbounded,
            end: Unbounded,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }
    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn should_never_contain_keys_of_an_empty_range(
            start: Vec<u8>,
            end: Vec<u8>,
            key: Vec<u8>,
        ) {
            let range = BytesRange::new(
                Excluded(Bytes::from(start)),
                Excluded(Bytes::from(end)),
            );
            if range.is_empty() {
                prop_assert!(!range.contains(&key));
            }
        }
    }

    #[test]
    fn should_contain_everything_when_unbounded() {
        let range = BytesRange::unbounded();

        assert!(range.contains(b""));
        assert!(range.contains(b"anything"));
        assert!(range.contains(&[0xFF, 0xFF, 0xFF]));
        assert!(!range.is_empty());
    }

    #[test]
    fn should_respect_inclusive_and_exclusive_bounds() {
        let range = BytesRange::new(Excluded(Bytes::from("a")), Included(Bytes::from("c")));

        assert!(!range.contains(b"a"));
        assert!(range.contains(b"a0"));
        assert!(range.contains(b"b"));
        assert!(range.contains(b"c"));
        assert!(!range.contains(b"c0"));
    }

    #[test]
    fn should_detect_empty_ranges() {
        let inverted = BytesRange::new(Included(Bytes::from("c")), Included(Bytes::from("a")));
        let touching = BytesRange::new(Excluded(Bytes::from("b")), Included(Bytes::from("b")));
        let single = BytesRange::new(Included(Bytes::from("b")), Included(Bytes::from("b")));

        assert!(inverted.is_empty());
        assert!(touching.is_empty());
        assert!(!single.is_empty());
    }
}
