//! Logical namespaces multiplexed over one flat, sorted keyspace.
//!
//! A namespace named `n` owns every physical key starting with `n/`. Because
//! `'0'` is the code point right after `'/'`, the sentinel `n0` is greater
//! than every key in the namespace and no greater than the first key of any
//! sibling namespace whose name extends `n` (`n2/...`, `na/...`).

use std::ops::Bound;

use crate::error::{Error, Result};
use crate::range::KeyRange;

const SEPARATOR: char = '/';
const SENTINEL: char = '0';

/// A validated namespace name with its derived prefix and stop sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    name: String,
    prefix: String,
    stop: String,
}

impl Namespace {
    /// Creates a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name contains `/`, which would
    /// let it overlap another namespace's prefix.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.contains(SEPARATOR) {
            return Err(Error::InvalidInput(format!(
                "namespace name {:?} must not contain '{}'",
                name, SEPARATOR
            )));
        }
        let prefix = format!("{}{}", name, SEPARATOR);
        let stop = format!("{}{}", name, SENTINEL);
        Ok(Self { name, prefix, stop })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stop(&self) -> &str {
        &self.stop
    }

    /// Maps a logical key to its physical key.
    pub fn physical_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Maps a physical key back to its logical key, if it belongs here.
    pub fn logical_key<'k>(&self, physical: &'k str) -> Option<&'k str> {
        physical.strip_prefix(self.prefix.as_str())
    }

    /// Rewrites a logical range into physical terms, clamped to the namespace.
    pub fn physical_range(&self, range: &KeyRange) -> KeyRange {
        let mut physical = range.prefixed(&self.prefix);
        if physical.lower == Bound::Unbounded {
            physical.lower = Bound::Included(self.prefix.clone());
        }
        if physical.upper == Bound::Unbounded {
            physical.upper = Bound::Excluded(self.stop.clone());
        }
        physical
    }

    /// Filters an ascending sequence of physical keys down to the logical
    /// keys of this namespace that lie inside `range`.
    ///
    /// The sequence may contain keys of any namespace. Iteration ends at the
    /// first key at or past the stop sentinel, before it is yielded.
    pub fn filter_keys<I>(&self, physical_keys: I, range: &KeyRange) -> FilterKeys<I::IntoIter>
    where
        I: IntoIterator<Item = String>,
    {
        FilterKeys {
            prefix: self.prefix.clone(),
            stop: self.stop.clone(),
            range: self.physical_range(range),
            inner: physical_keys.into_iter(),
            started: false,
            done: false,
        }
    }
}

/// Iterator returned by [`Namespace::filter_keys`].
pub struct FilterKeys<I> {
    prefix: String,
    stop: String,
    range: KeyRange,
    inner: I,
    started: bool,
    done: bool,
}

impl<I> Iterator for FilterKeys<I>
where
    I: Iterator<Item = String>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        for physical in self.inner.by_ref() {
            if physical >= self.stop {
                self.done = true;
                return None;
            }
            if !self.started {
                if !self.range.has_started(&physical) {
                    continue;
                }
                self.started = true;
            }
            if self.range.stops_before(&physical) {
                self.done = true;
                return None;
            }
            if self.range.stops_after(&physical) {
                self.done = true;
            }
            if let Some(logical) = physical.strip_prefix(self.prefix.as_str()) {
                return Some(logical.to_owned());
            }
            if self.done {
                return None;
            }
        }
        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn physical(keys: &[&str]) -> Vec<String> {
        let sorted: BTreeSet<String> = keys.iter().map(|k| k.to_string()).collect();
        sorted.into_iter().collect()
    }

    fn filter(ns: &str, keys: &[&str], range: KeyRange) -> Vec<String> {
        Namespace::new(ns)
            .unwrap()
            .filter_keys(physical(keys), &range)
            .collect()
    }

    #[test]
    fn should_derive_prefix_and_stop() {
        // when
        let ns = Namespace::new("users").unwrap();

        // then
        assert_eq!(ns.prefix(), "users/");
        assert_eq!(ns.stop(), "users0");
        assert_eq!(ns.physical_key("alice"), "users/alice");
        assert_eq!(ns.logical_key("users/alice"), Some("alice"));
        assert_eq!(ns.logical_key("users2/alice"), None);
    }

    #[test]
    fn should_reject_separator_in_name() {
        let result = Namespace::new("a/b");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn should_not_leak_into_sibling_with_longer_name() {
        // given
        let keys = ["a/x", "a/y", "a2/x", "a2/z", "b/x"];

        // when
        let in_a = filter("a", &keys, KeyRange::all());
        let in_a2 = filter("a2", &keys, KeyRange::all());

        // then
        assert_eq!(in_a, vec!["x", "y"]);
        assert_eq!(in_a2, vec!["x", "z"]);
    }

    #[test]
    fn should_stop_at_sentinel_without_yielding_it() {
        // given
        let keys = ["a/x", "a0", "a0/leak"];

        // when
        let yielded = filter("a", &keys, KeyRange::all());

        // then
        assert_eq!(yielded, vec!["x"]);
    }

    #[test]
    fn should_skip_keys_before_the_prefix() {
        let keys = ["", "-", "a", "a.", "a/b"];
        assert_eq!(filter("a", &keys, KeyRange::all()), vec!["b"]);
    }

    #[test]
    fn should_yield_empty_logical_key() {
        let keys = ["a/", "a/b"];
        assert_eq!(filter("a", &keys, KeyRange::all()), vec!["", "b"]);
    }

    #[rstest]
    #[case(KeyRange::builder().gt("a"), &["b", "c"])]
    #[case(KeyRange::builder().gte("b"), &["b", "c"])]
    #[case(KeyRange::builder().lt("b"), &["a"])]
    #[case(KeyRange::builder().lte("b"), &["a", "b"])]
    #[case(KeyRange::builder().gt("a").lt("c"), &["b"])]
    #[case(KeyRange::builder().gte("a").lte("c"), &["a", "b", "c"])]
    #[case(KeyRange::builder().gt("c"), &[])]
    #[case(KeyRange::builder().lte("zz"), &["a", "b", "c"])]
    fn should_apply_logical_bounds(
        #[case] builder: crate::range::KeyRangeBuilder,
        #[case] expected: &[&str],
    ) {
        // given
        let keys = ["n/a", "n/b", "n/c", "n2/a", "n2/b", "m/z"];

        // when
        let yielded = filter("n", &keys, builder.build().unwrap());

        // then
        assert_eq!(yielded, expected);
    }

    #[test]
    fn should_stop_pulling_at_sentinel() {
        // given
        let ns = Namespace::new("a").unwrap();
        let mut pulled = 0;
        let keys = physical(&["a/1", "a/2", "a0", "b/1", "c/1"]);

        // when
        let yielded: Vec<_> = ns
            .filter_keys(keys.into_iter().inspect(|_| pulled += 1), &KeyRange::all())
            .collect();

        // then
        assert_eq!(yielded, vec!["1", "2"]);
        assert_eq!(pulled, 3);
    }

    fn arb_bound() -> impl Strategy<Value = Bound<String>> {
        prop_oneof![
            Just(Bound::Unbounded),
            "[a-c0/]{0,3}".prop_map(Bound::Excluded),
            "[a-c0/]{0,3}".prop_map(Bound::Included),
        ]
    }

    proptest! {
        #[test]
        fn should_yield_exactly_own_keys_in_range(
            keys in proptest::collection::btree_set("(a|a2|a0|b|ab)/[a-c0/]{0,3}", 0..32),
            ns in prop_oneof![Just("a"), Just("a2"), Just("ab"), Just("b")],
            lower in arb_bound(),
            upper in arb_bound(),
        ) {
            let namespace = Namespace::new(ns).unwrap();
            let range = KeyRange::new(lower, upper);

            let yielded: Vec<String> = namespace.filter_keys(keys.iter().cloned(), &range).collect();
            let expected: Vec<String> = keys
                .iter()
                .filter_map(|k| namespace.logical_key(k))
                .filter(|k| range.contains(k))
                .map(str::to_owned)
                .collect();

            prop_assert_eq!(yielded, expected);
        }
    }
}
