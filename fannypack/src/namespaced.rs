//! Many logical stores multiplexed onto one flat storage.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::{BytesRange, Record, RecordOp, Storage, StorageRead, StorageSnapshot};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::codec::{decode_value, encode_value};
use crate::error::{Error, Result};
use crate::namespace::{FilterKeys, Namespace};
use crate::range::KeyRange;
use crate::store::{
    Cursor, EntryIterator, KeyIterator, RangeIterator, RawCursor, Store, ValueIterator,
    entries_of, values_of,
};

/// Default number of values fetched per round trip during a range query.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// How many values a range query fetches per storage round trip.
///
/// Batch boundaries never change which entries are yielded or their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    size: usize,
}

impl BatchPolicy {
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a size of zero.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A store confined to one [`Namespace`] of a shared flat storage.
///
/// Every logical key `k` is stored at `{name}/k`. Range queries list the
/// flat keyspace from a storage snapshot, filter it down to the namespace,
/// then fetch values in batches from the same snapshot.
///
/// Point operations, `clear`, the key listing and each batch fetch are
/// serialized by a mutex shared with every [`NamespacedStore::sibling`], so
/// a range query never observes a `clear` half done.
pub struct NamespacedStore {
    storage: Arc<dyn Storage>,
    namespace: Namespace,
    batch: BatchPolicy,
    lock: Arc<Mutex<()>>,
}

impl NamespacedStore {
    pub fn new(storage: Arc<dyn Storage>, name: impl Into<String>) -> Result<Self> {
        Ok(Self::with_namespace(storage, Namespace::new(name)?))
    }

    pub fn with_namespace(storage: Arc<dyn Storage>, namespace: Namespace) -> Self {
        Self {
            storage,
            namespace,
            batch: BatchPolicy::default(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_batch_policy(mut self, batch: BatchPolicy) -> Self {
        self.batch = batch;
        self
    }

    /// Opens another namespace over the same storage and lock.
    pub fn sibling(&self, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            storage: self.storage.clone(),
            namespace: Namespace::new(name)?,
            batch: self.batch,
            lock: self.lock.clone(),
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch
    }

    fn physical(&self, key: &str) -> Bytes {
        Bytes::from(self.namespace.physical_key(key))
    }

    /// Lists the flat keyspace of `reader`, in order.
    async fn list_keys<R: StorageRead + ?Sized>(reader: &R) -> Result<Vec<String>> {
        let records = reader.scan(BytesRange::unbounded()).await?;
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            match String::from_utf8(record.key.to_vec()) {
                Ok(key) => keys.push(key),
                Err(_) => tracing::warn!(key = ?record.key, "skipping non-UTF-8 key"),
            }
        }
        Ok(keys)
    }

    async fn snapshot_keys(
        &self,
        range: &KeyRange,
    ) -> Result<(Arc<dyn StorageSnapshot>, FilterKeys<std::vec::IntoIter<String>>)> {
        let _guard = self.lock.lock().await;
        let snapshot = self.storage.snapshot().await?;
        let listed = Self::list_keys(snapshot.as_ref()).await?;
        Ok((snapshot, self.namespace.filter_keys(listed, range)))
    }

    async fn scan(&self, range: &KeyRange) -> Result<RawCursor> {
        let (snapshot, keys) = self.snapshot_keys(range).await?;
        Ok(Box::new(BatchCursor {
            snapshot,
            namespace: self.namespace.clone(),
            keys,
            buffer: VecDeque::new(),
            batch_size: self.batch.size(),
            lock: self.lock.clone(),
        }))
    }
}

#[async_trait]
impl Store for NamespacedStore {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let listed = Self::list_keys(self.storage.as_ref()).await?;
        let ops: Vec<RecordOp> = self
            .namespace
            .filter_keys(listed, &KeyRange::all())
            .map(|key| RecordOp::Delete(self.physical(&key)))
            .collect();
        let count = ops.len();
        self.storage.apply(ops).await?;
        tracing::debug!(namespace = self.namespace.name(), count, "cleared namespace");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage
            .apply(vec![RecordOp::Delete(self.physical(key))])
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let record = self.storage.get(self.physical(key)).await?;
        record.map(|record| decode_value(&record.value)).transpose()
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.storage.get(self.physical(key)).await?.is_some())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let record = Record::new(self.physical(key), encode_value(value)?);
        let _guard = self.lock.lock().await;
        self.storage.put(vec![record]).await?;
        Ok(())
    }

    async fn keys(&self, range: KeyRange) -> Result<KeyIterator> {
        let (_, keys) = self.snapshot_keys(&range).await?;
        Ok(RangeIterator::new(KeyCursor { keys }))
    }

    async fn values(&self, range: KeyRange) -> Result<ValueIterator> {
        Ok(values_of(self.scan(&range).await?))
    }

    async fn entries(&self, range: KeyRange) -> Result<EntryIterator> {
        Ok(entries_of(self.scan(&range).await?))
    }

    /// Closes the shared storage, which ends every sibling as well.
    async fn close(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage.flush().await?;
        self.storage.close().await?;
        tracing::debug!(namespace = self.namespace.name(), "closed namespaced store");
        Ok(())
    }
}

struct KeyCursor {
    keys: FilterKeys<std::vec::IntoIter<String>>,
}

#[async_trait]
impl Cursor for KeyCursor {
    type Item = String;

    async fn next(&mut self) -> Result<Option<String>> {
        Ok(self.keys.next())
    }
}

/// Pulls filtered keys a batch at a time and fetches their values together.
struct BatchCursor {
    snapshot: Arc<dyn StorageSnapshot>,
    namespace: Namespace,
    keys: FilterKeys<std::vec::IntoIter<String>>,
    buffer: VecDeque<(String, Bytes)>,
    batch_size: usize,
    lock: Arc<Mutex<()>>,
}

impl BatchCursor {
    /// Fetches the next batch into the buffer. Returns `false` once no keys remain.
    async fn fill(&mut self) -> Result<bool> {
        let batch: Vec<String> = self.keys.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            return Ok(false);
        }
        let physical = batch
            .iter()
            .map(|key| Bytes::from(self.namespace.physical_key(key)))
            .collect();
        let records = {
            let _guard = self.lock.lock().await;
            self.snapshot.get_many(physical).await?
        };
        if records.len() != batch.len() {
            return Err(Error::Internal(format!(
                "requested {} values, storage returned {}",
                batch.len(),
                records.len()
            )));
        }
        for (key, record) in batch.into_iter().zip(records) {
            if let Some(record) = record {
                self.buffer.push_back((key, record.value));
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl Cursor for BatchCursor {
    type Item = (String, Bytes);

    async fn next(&mut self) -> Result<Option<(String, Bytes)>> {
        while self.buffer.is_empty() {
            if !self.fill().await? {
                return Ok(None);
            }
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use common::StorageError;
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use serde_json::json;

    use super::*;

    fn shared() -> Arc<dyn Storage> {
        Arc::new(InMemoryStorage::new())
    }

    #[tokio::test]
    async fn should_prefix_physical_keys() {
        // given
        let storage = shared();
        let store = NamespacedStore::new(storage.clone(), "users").unwrap();

        // when
        store.set("alice", &json!(1)).await.unwrap();

        // then
        let record = storage.get(Bytes::from("users/alice")).await.unwrap();
        assert!(record.is_some());
    }

    #[tokio::test]
    async fn should_clear_only_own_namespace() {
        // given
        let a = NamespacedStore::new(shared(), "a").unwrap();
        let a2 = a.sibling("a2").unwrap();
        a.set("x", &json!(1)).await.unwrap();
        a2.set("x", &json!(2)).await.unwrap();

        // when
        a.clear().await.unwrap();

        // then
        assert!(!a.has("x").await.unwrap());
        assert_eq!(a2.get("x").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn should_yield_entries_across_batch_boundaries() {
        // given
        let store = NamespacedStore::new(shared(), "n")
            .unwrap()
            .with_batch_policy(BatchPolicy::new(3).unwrap());
        let other = store.sibling("n2").unwrap();
        for i in 0..10 {
            store.set(&format!("k{}", i), &json!(i)).await.unwrap();
            other.set(&format!("k{}", i), &json!(-i)).await.unwrap();
        }

        // when
        let entries = store
            .entries(KeyRange::all())
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        // then
        let expected: Vec<_> = (0..10).map(|i| (format!("k{}", i), json!(i))).collect();
        assert_eq!(entries, expected);
    }

    #[tokio::test]
    async fn should_read_from_snapshot_taken_at_call() {
        // given
        let store = NamespacedStore::new(shared(), "n")
            .unwrap()
            .with_batch_policy(BatchPolicy::new(1).unwrap());
        store.set("a", &json!(1)).await.unwrap();
        store.set("b", &json!(2)).await.unwrap();
        let mut values = store.values(KeyRange::all()).await.unwrap();

        // when
        assert_eq!(values.next().await.unwrap(), Some(json!(1)));
        store.clear().await.unwrap();

        // then
        assert_eq!(values.next().await.unwrap(), Some(json!(2)));
        assert_eq!(values.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_skip_non_utf8_foreign_keys() {
        // given
        let storage = shared();
        storage
            .put(vec![Record::new(
                Bytes::from_static(&[0xff]),
                Bytes::from("1"),
            )])
            .await
            .unwrap();
        let store = NamespacedStore::new(storage, "n").unwrap();
        store.set("a", &json!(1)).await.unwrap();

        // when
        let keys = store.keys(KeyRange::all()).await.unwrap().collect().await.unwrap();

        // then
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn should_reject_empty_batch() {
        assert!(matches!(BatchPolicy::new(0), Err(Error::InvalidInput(_))));
        assert_eq!(BatchPolicy::default().size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn should_reject_invalid_namespace_name() {
        let result = NamespacedStore::new(shared(), "a/b");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_surface_clear_failure() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let store = NamespacedStore::new(failing.clone(), "n").unwrap();
        store.set("a", &json!(1)).await.unwrap();
        failing.fail_write(StorageError::Storage("read only".to_string()));

        // when
        let cleared = store.clear().await;

        // then
        assert_eq!(cleared, Err(Error::Storage("read only".to_string())));
        failing.heal();
        assert!(store.has("a").await.unwrap());
    }
}
