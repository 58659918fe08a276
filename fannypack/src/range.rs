//! Key ranges and the predicate that drives ordered iteration.
//!
//! A [`KeyRange`] holds at most one bound per side. Iteration over an
//! ascending key sequence asks three questions of it for every key:
//!
//! - [`KeyRange::has_started`]: has the lower bound been passed?
//! - [`KeyRange::stops_before`]: is the key already beyond the upper bound?
//! - [`KeyRange::stops_after`]: is the key the last one the upper bound admits?
//!
//! The two stop checks are independent, so an inclusive upper bound ends the
//! walk at its key without filtering that key out, and still ends it when the
//! bound key itself is absent.
//!
//! Comparisons are on the raw key string, which orders by code point (the
//! same order as the UTF-8 bytes).

use std::ops::{Bound, RangeBounds};

use bytes::Bytes;
use common::BytesRange;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A pair of optional bounds restricting a range query.
///
/// `KeyRange::default()` is unbounded on both sides and selects every key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyRangeBuilder", into = "KeyRangeBuilder")]
pub struct KeyRange {
    pub lower: Bound<String>,
    pub upper: Bound<String>,
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::all()
    }
}

impl KeyRange {
    pub fn new(lower: Bound<String>, upper: Bound<String>) -> Self {
        Self { lower, upper }
    }

    /// Selects every key.
    pub fn all() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Starts a range in the `{ gt, gte, lt, lte }` form.
    pub fn builder() -> KeyRangeBuilder {
        KeyRangeBuilder::default()
    }

    /// Converts std range syntax over string slices, e.g. `"a".."c"` or
    /// `(Bound::Excluded("a"), Bound::Unbounded)`.
    pub fn from_range<'a>(range: impl RangeBounds<&'a str>) -> Self {
        let owned = |bound: Bound<&&'a str>| bound.map(|key| (*key).to_owned());
        Self::new(owned(range.start_bound()), owned(range.end_bound()))
    }

    /// True once `key` is at or past the lower bound.
    pub fn has_started(&self, key: &str) -> bool {
        match &self.lower {
            Bound::Unbounded => true,
            Bound::Excluded(bound) => key > bound.as_str(),
            Bound::Included(bound) => key >= bound.as_str(),
        }
    }

    /// True when `key` lies beyond the upper bound and must not be yielded.
    pub fn stops_before(&self, key: &str) -> bool {
        match &self.upper {
            Bound::Unbounded => false,
            Bound::Excluded(bound) => key >= bound.as_str(),
            Bound::Included(bound) => key > bound.as_str(),
        }
    }

    /// True when `key` is the last key the upper bound admits.
    pub fn stops_after(&self, key: &str) -> bool {
        match &self.upper {
            Bound::Included(bound) => key >= bound.as_str(),
            _ => false,
        }
    }

    /// Membership test computed without iteration.
    pub fn contains(&self, key: &str) -> bool {
        self.has_started(key) && !self.stops_before(key)
    }

    /// Walks an ascending sequence, yielding only the items inside the range.
    ///
    /// The walk stops pulling from `sorted` as soon as the upper bound is
    /// reached, so an unbounded source is fine.
    pub fn walk<I>(&self, sorted: I) -> RangeWalk<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: KeyOf,
    {
        RangeWalk {
            range: self,
            inner: sorted.into_iter(),
            started: false,
            done: false,
        }
    }

    /// Rewrites every bound as `prefix + bound`.
    ///
    /// Unbounded sides stay unbounded; callers that multiplex a keyspace
    /// supply their own outer limits.
    pub(crate) fn prefixed(&self, prefix: &str) -> KeyRange {
        let add = |bound: &Bound<String>| bound.as_ref().map(|key| format!("{}{}", prefix, key));
        KeyRange::new(add(&self.lower), add(&self.upper))
    }

    /// Translates this range into native physical bounds.
    pub fn to_bytes_range(&self) -> BytesRange {
        let to_bytes = |bound: &Bound<String>| bound.as_ref().map(|key| Bytes::from(key.clone()));
        BytesRange::new(to_bytes(&self.lower), to_bytes(&self.upper))
    }
}

impl RangeBounds<String> for KeyRange {
    fn start_bound(&self) -> Bound<&String> {
        self.lower.as_ref()
    }
    fn end_bound(&self) -> Bound<&String> {
        self.upper.as_ref()
    }
}

/// The loose `{ gt, gte, lt, lte }` form of a range.
///
/// Any combination of fields can be set here; [`KeyRangeBuilder::build`]
/// rejects two bounds on the same side instead of picking one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRangeBuilder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

impl KeyRangeBuilder {
    pub fn gt(mut self, key: impl Into<String>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn gte(mut self, key: impl Into<String>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<String>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<String>) -> Self {
        self.lte = Some(key.into());
        self
    }

    /// Validates the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if both `gt` and `gte`, or both `lt`
    /// and `lte`, are set.
    pub fn build(self) -> Result<KeyRange> {
        let lower = match (self.gt, self.gte) {
            (Some(gt), Some(gte)) => {
                return Err(Error::InvalidInput(format!(
                    "range has both gt ({:?}) and gte ({:?}) lower bounds",
                    gt, gte
                )));
            }
            (Some(gt), None) => Bound::Excluded(gt),
            (None, Some(gte)) => Bound::Included(gte),
            (None, None) => Bound::Unbounded,
        };
        let upper = match (self.lt, self.lte) {
            (Some(lt), Some(lte)) => {
                return Err(Error::InvalidInput(format!(
                    "range has both lt ({:?}) and lte ({:?}) upper bounds",
                    lt, lte
                )));
            }
            (Some(lt), None) => Bound::Excluded(lt),
            (None, Some(lte)) => Bound::Included(lte),
            (None, None) => Bound::Unbounded,
        };
        Ok(KeyRange::new(lower, upper))
    }
}

impl TryFrom<KeyRangeBuilder> for KeyRange {
    type Error = Error;

    fn try_from(builder: KeyRangeBuilder) -> Result<Self> {
        builder.build()
    }
}

impl From<KeyRange> for KeyRangeBuilder {
    fn from(range: KeyRange) -> Self {
        let mut builder = KeyRangeBuilder::default();
        match range.lower {
            Bound::Excluded(key) => builder.gt = Some(key),
            Bound::Included(key) => builder.gte = Some(key),
            Bound::Unbounded => {}
        }
        match range.upper {
            Bound::Excluded(key) => builder.lt = Some(key),
            Bound::Included(key) => builder.lte = Some(key),
            Bound::Unbounded => {}
        }
        builder
    }
}

/// Items that carry a key for range comparison.
pub trait KeyOf {
    fn key_of(&self) -> &str;
}

impl KeyOf for String {
    fn key_of(&self) -> &str {
        self
    }
}

impl KeyOf for &str {
    fn key_of(&self) -> &str {
        self
    }
}

impl KeyOf for &String {
    fn key_of(&self) -> &str {
        self
    }
}

impl<K: AsRef<str>, V> KeyOf for (K, V) {
    fn key_of(&self) -> &str {
        self.0.as_ref()
    }
}

/// Iterator returned by [`KeyRange::walk`].
pub struct RangeWalk<'r, I> {
    range: &'r KeyRange,
    inner: I,
    started: bool,
    done: bool,
}

impl<I> Iterator for RangeWalk<'_, I>
where
    I: Iterator,
    I::Item: KeyOf,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for item in self.inner.by_ref() {
            let key = item.key_of();
            if !self.started && self.range.has_started(key) {
                self.started = true;
            }
            if self.range.stops_before(key) {
                self.done = true;
                return None;
            }
            if self.range.stops_after(key) {
                self.done = true;
            }
            if self.started {
                return Some(item);
            }
            if self.done {
                return None;
            }
        }
        self.done = true;
        None
    }
}
