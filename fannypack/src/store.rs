//! The [`Store`] contract and the pull-based iterators its range queries return.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::decode_value;
use crate::error::{Error, Result};
use crate::range::KeyRange;

/// A decoded `(key, value)` pair.
pub type Entry = (String, Value);

/// Capability set every backend adapter implements.
///
/// Keys are ordered by code point. Values are JSON and are deep-copied on
/// the way in and on the way out: a caller can never alias the stored copy.
///
/// Range queries return lazy iterators in ascending key order. Each call
/// starts a fresh sequence, and dropping an iterator before it is drained
/// releases whatever it holds.
#[async_trait]
pub trait Store: Send + Sync {
    /// Removes every entry this store owns.
    async fn clear(&self) -> Result<()>;

    /// Removes `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Returns the value at `key`, or `None` if absent.
    ///
    /// A stored JSON `null` is `Some(Value::Null)`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// True iff [`Store::get`] would return `Some`.
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Upserts `value` at `key`.
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    async fn keys(&self, range: KeyRange) -> Result<KeyIterator>;

    async fn values(&self, range: KeyRange) -> Result<ValueIterator>;

    async fn entries(&self, range: KeyRange) -> Result<EntryIterator>;

    /// Releases the backend. Further calls may fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed convenience wrappers over [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    /// Reads `key` and deserializes it into `T`.
    async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Encoding(format!("failed to convert {:?}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Serializes `value` and writes it at `key`.
    async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::Encoding(format!("failed to convert {:?}: {}", key, e)))?;
        self.set(key, &value).await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// A pull-based sequence whose steps may suspend on I/O.
#[async_trait]
pub trait Cursor: Send {
    type Item: Send;

    /// Returns the next item, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Self::Item>>;
}

/// A raw `(key, stored bytes)` cursor, the common currency of the adapters.
pub(crate) type RawCursor = Box<dyn Cursor<Item = (String, Bytes)>>;

/// Iterator returned by the range queries of [`Store`].
pub struct RangeIterator<T> {
    inner: Box<dyn Cursor<Item = T>>,
}

pub type KeyIterator = RangeIterator<String>;
pub type ValueIterator = RangeIterator<Value>;
pub type EntryIterator = RangeIterator<Entry>;

impl<T: Send + 'static> RangeIterator<T> {
    pub fn new(cursor: impl Cursor<Item = T> + 'static) -> Self {
        Self {
            inner: Box::new(cursor),
        }
    }

    /// Returns the next item, or `None` once exhausted.
    pub async fn next(&mut self) -> Result<Option<T>> {
        self.inner.next().await
    }

    /// Drains the remaining items.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }
}

#[async_trait]
impl<T: Send> Cursor for RangeIterator<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        self.inner.next().await
    }
}

/// A cursor over items already in memory.
pub struct VecCursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecCursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

#[async_trait]
impl<T: Send> Cursor for VecCursor<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        Ok(self.items.next())
    }
}

/// Applies a fallible conversion to every item of a cursor.
struct MapCursor<C, F> {
    inner: C,
    f: F,
}

#[async_trait]
impl<C, F, T> Cursor for MapCursor<C, F>
where
    C: Cursor,
    F: FnMut(C::Item) -> Result<T> + Send,
    T: Send,
{
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        match self.inner.next().await? {
            Some(item) => (self.f)(item).map(Some),
            None => Ok(None),
        }
    }
}

/// Projects raw entries to their keys.
pub(crate) fn keys_of(raw: RawCursor) -> KeyIterator {
    RangeIterator::new(MapCursor {
        inner: raw,
        f: |(key, _): (String, Bytes)| -> Result<String> { Ok(key) },
    })
}

/// Projects raw entries to freshly decoded values.
pub(crate) fn values_of(raw: RawCursor) -> ValueIterator {
    RangeIterator::new(MapCursor {
        inner: raw,
        f: |(_, stored): (String, Bytes)| decode_value(&stored),
    })
}

/// Projects raw entries to decoded entries.
pub(crate) fn entries_of(raw: RawCursor) -> EntryIterator {
    RangeIterator::new(MapCursor {
        inner: raw,
        f: |(key, stored): (String, Bytes)| -> Result<Entry> {
            Ok((key, decode_value(&stored)?))
        },
    })
}

#[async_trait]
impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    async fn next(&mut self) -> Result<Option<C::Item>> {
        (**self).next().await
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::codec::encode_value;
    use crate::memory::MemoryStore;

    fn raw(entries: &[(&str, Value)]) -> RawCursor {
        let items = entries
            .iter()
            .map(|(k, v)| (k.to_string(), encode_value(v).unwrap()))
            .collect();
        Box::new(VecCursor::new(items))
    }

    #[tokio::test]
    async fn should_project_raw_entries() {
        // given
        let source = [("a", json!(1)), ("b", json!("two"))];

        // when
        let keys = keys_of(raw(&source)).collect().await.unwrap();
        let values = values_of(raw(&source)).collect().await.unwrap();
        let entries = entries_of(raw(&source)).collect().await.unwrap();

        // then
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(values, vec![json!(1), json!("two")]);
        assert_eq!(
            entries,
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!("two"))]
        );
    }

    #[tokio::test]
    async fn should_surface_decode_failure_as_error() {
        // given
        let cursor: RawCursor = Box::new(VecCursor::new(vec![(
            "a".to_string(),
            Bytes::from_static(b"{not json"),
        )]));

        // when
        let result = values_of(cursor).next().await;

        // then
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[tokio::test]
    async fn should_stay_exhausted() {
        // given
        let mut iter = RangeIterator::new(VecCursor::new(vec![1]));

        // when
        let first = iter.next().await.unwrap();
        let second = iter.next().await.unwrap();
        let third = iter.next().await.unwrap();

        // then
        assert_eq!(first, Some(1));
        assert!(second.is_none());
        assert!(third.is_none());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[tokio::test]
    async fn should_read_and_write_typed_values() {
        // given
        let store = MemoryStore::new();
        let profile = Profile {
            name: "ada".to_string(),
            visits: 3,
        };

        // when
        store.set_as("p", &profile).await.unwrap();
        let read: Option<Profile> = store.get_as("p").await.unwrap();
        let missing: Option<Profile> = store.get_as("q").await.unwrap();

        // then
        assert_eq!(read, Some(profile));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn should_fail_typed_read_of_mismatched_value() {
        // given
        let store = MemoryStore::new();
        store.set("p", &json!("not a profile")).await.unwrap();

        // when
        let result = store.get_as::<Profile>("p").await;

        // then
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}
