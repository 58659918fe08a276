use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{Storage, StorageSnapshot, WriteOptions};
use crate::storage::RecordOp;
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// This implementation stores all data in memory and is useful for testing
/// or scenarios where durability is not required.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_range(data: &BTreeMap<Bytes, Bytes>, range: &BytesRange) -> Vec<Record> {
    if range.is_empty() {
        return Vec::new();
    }
    data.range((range.start_bound().cloned(), range.end_bound().cloned()))
        .map(|(k, v)| Record::new(k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    /// Retrieves a single record by key from the in-memory store.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).map(|value| Record::new(key, value.clone())))
    }

    /// Serves the whole batch under one read lock.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get_many(&self, keys: Vec<Bytes>) -> StorageResult<Vec<Option<Record>>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(keys
            .into_iter()
            .map(|key| {
                let value = data.get(&key).cloned();
                value.map(|value| Record::new(key, value))
            })
            .collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        let records = collect_range(&data, &range);
        Ok(Box::new(InMemoryIterator { records, index: 0 }))
    }
}

struct InMemoryIterator {
    records: Vec<Record>,
    index: usize,
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        if self.index >= self.records.len() {
            Ok(None)
        } else {
            let record = self.records[self.index].clone();
            self.index += 1;
            Ok(Some(record))
        }
    }
}

/// In-memory snapshot that holds a copy of the data at the time of snapshot creation.
pub struct InMemoryStorageSnapshot {
    data: Arc<BTreeMap<Bytes, Bytes>>,
}

#[async_trait]
impl StorageRead for InMemoryStorageSnapshot {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        Ok(self
            .data
            .get(&key)
            .map(|value| Record::new(key, value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let records = collect_range(&self.data, &range);
        Ok(Box::new(InMemoryIterator { records, index: 0 }))
    }
}

#[async_trait]
impl StorageSnapshot for InMemoryStorageSnapshot {}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    /// Writes a batch of records to the in-memory store.
    ///
    /// All records are written atomically within a single write lock acquisition.
    /// Write options are ignored since there is no durable storage to await.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for record in records {
            data.insert(record.key, record.value);
        }

        Ok(())
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(Arc::new(InMemoryStorageSnapshot {
            data: Arc::new(data.clone()),
        }))
    }

    async fn flush(&self) -> StorageResult<()> {
        // all writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StorageError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into reads, scans and writes on demand.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared).
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
/// storage.fail_get(StorageError::Storage("disk unavailable".into()));
/// // every get and get_many call now returns Err(...)
///
/// storage.fail_write_once(StorageError::Storage("quota exceeded".into()));
/// // only the next apply/put call returns Err(...), then auto-clears
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_get: FailSlot,
    fail_scan: FailSlot,
    fail_write: FailSlot,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_get: arc_swap::ArcSwap::from_pointee(None),
            fail_scan: arc_swap::ArcSwap::from_pointee(None),
            fail_write: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes `get` and `get_many` return the given error on every subsequent call.
    pub fn fail_get(&self, err: StorageError) {
        self.fail_get
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `scan_iter` return the given error on every subsequent call.
    pub fn fail_scan(&self, err: StorageError) {
        self.fail_scan
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `apply`, `put` and `put_with_options` return the given error on
    /// every subsequent call.
    pub fn fail_write(&self, err: StorageError) {
        self.fail_write
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes the next write return the given error only.
    pub fn fail_write_once(&self, err: StorageError) {
        self.fail_write.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        self.fail_get.store(Arc::new(None));
        self.fail_scan.store(Arc::new(None));
        self.fail_write.store(Arc::new(None));
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: Vec<Bytes>) -> StorageResult<Vec<Option<Record>>> {
        check_failure(&self.fail_get)?;
        self.inner.get_many(keys).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_iter(range).await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        check_failure(&self.fail_write)?;
        self.inner.apply(ops).await
    }

    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        check_failure(&self.fail_write)?;
        self.inner.put(records).await
    }

    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        check_failure(&self.fail_write)?;
        self.inner.put_with_options(records, options).await
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        self.inner.snapshot().await
    }

    async fn flush(&self) -> StorageResult<()> {
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Bound;

    #[tokio::test]
    async fn should_return_none_when_key_not_found() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.get(Bytes::from("missing_key")).await;

        // then
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_store_and_retrieve_record() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("test_key");
        let value = Bytes::from("test_value");

        // when
        storage
            .put(vec![Record::new(key.clone(), value.clone())])
            .await
            .unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        let record = result.unwrap();
        assert_eq!(record.key, Bytes::from("test_key"));
        assert_eq!(record.value, value);
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("test_key");
        let updated_value = Bytes::from("updated_value");
        storage
            .put(vec![Record::new(key.clone(), Bytes::from("initial_value"))])
            .await
            .unwrap();

        // when
        storage
            .put(vec![Record::new(key.clone(), updated_value.clone())])
            .await
            .unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        assert_eq!(result.unwrap().value, updated_value);
    }

    #[tokio::test]
    async fn should_apply_puts_and_deletes_together() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![Record::new(Bytes::from("a"), Bytes::from("1"))])
            .await
            .unwrap();

        // when
        storage
            .apply(vec![
                RecordOp::Delete(Bytes::from("a")),
                Record::new(Bytes::from("b"), Bytes::from("2")).into(),
                RecordOp::Delete(Bytes::from("never-written")),
            ])
            .await
            .unwrap();

        // then
        assert!(storage.get(Bytes::from("a")).await.unwrap().is_none());
        assert_eq!(
            storage.get(Bytes::from("b")).await.unwrap().unwrap().value,
            Bytes::from("2")
        );
    }

    #[tokio::test]
    async fn should_get_many_in_request_order() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![
                Record::new(Bytes::from("a"), Bytes::from("1")),
                Record::new(Bytes::from("c"), Bytes::from("3")),
            ])
            .await
            .unwrap();

        // when
        let records = storage
            .get_many(vec![Bytes::from("c"), Bytes::from("b"), Bytes::from("a")])
            .await
            .unwrap();

        // then
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref().unwrap().value, Bytes::from("3"));
        assert!(records[1].is_none());
        assert_eq!(records[2].as_ref().unwrap().value, Bytes::from("1"));
    }

    #[tokio::test]
    async fn should_scan_all_records_when_unbounded() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![
                Record::new(Bytes::from("c"), Bytes::from("value_c")),
                Record::new(Bytes::from("a"), Bytes::from("value_a")),
                Record::new(Bytes::from("b"), Bytes::from("value_b")),
            ])
            .await
            .unwrap();

        // when
        let scanned = storage.scan(BytesRange::unbounded()).await.unwrap();

        // then
        assert_eq!(scanned.len(), 3);
        assert_eq!(scanned[0].key, Bytes::from("a"));
        assert_eq!(scanned[1].key, Bytes::from("b"));
        assert_eq!(scanned[2].key, Bytes::from("c"));
    }

    #[tokio::test]
    async fn should_scan_records_in_bounded_range() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![
                Record::new(Bytes::from("a"), Bytes::from("value_a")),
                Record::new(Bytes::from("b"), Bytes::from("value_b")),
                Record::new(Bytes::from("c"), Bytes::from("value_c")),
                Record::new(Bytes::from("d"), Bytes::from("value_d")),
            ])
            .await
            .unwrap();

        // when
        let range = BytesRange::new(
            Bound::Included(Bytes::from("b")),
            Bound::Excluded(Bytes::from("d")),
        );
        let scanned = storage.scan(range).await.unwrap();

        // then
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].key, Bytes::from("b"));
        assert_eq!(scanned[1].key, Bytes::from("c"));
    }

    #[tokio::test]
    async fn should_return_nothing_for_inverted_range() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![Record::new(Bytes::from("b"), Bytes::from("2"))])
            .await
            .unwrap();

        // when
        let range = BytesRange::new(
            Bound::Excluded(Bytes::from("c")),
            Bound::Excluded(Bytes::from("a")),
        );
        let scanned = storage.scan(range).await.unwrap();

        // then
        assert!(scanned.is_empty());
    }

    #[tokio::test]
    async fn should_iterate_over_records() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![
                Record::new(Bytes::from("key1"), Bytes::from("value1")),
                Record::new(Bytes::from("key2"), Bytes::from("value2")),
            ])
            .await
            .unwrap();

        // when
        let mut iter = storage.scan_iter(BytesRange::unbounded()).await.unwrap();
        let first = iter.next().await.unwrap();
        let second = iter.next().await.unwrap();
        let third = iter.next().await.unwrap();

        // then
        assert_eq!(first.unwrap().key, Bytes::from("key1"));
        assert_eq!(second.unwrap().key, Bytes::from("key2"));
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn should_not_see_writes_after_snapshot() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .put(vec![Record::new(Bytes::from("a"), Bytes::from("value_a"))])
            .await
            .unwrap();

        // when
        let snapshot = storage.snapshot().await.unwrap();
        storage
            .put(vec![Record::new(Bytes::from("b"), Bytes::from("value_b"))])
            .await
            .unwrap();

        // then
        assert!(snapshot.get(Bytes::from("b")).await.unwrap().is_none());
        let snapshot_records = snapshot.scan(BytesRange::unbounded()).await.unwrap();
        assert_eq!(snapshot_records.len(), 1);
        assert_eq!(snapshot_records[0].key, Bytes::from("a"));

        let storage_records = storage.scan(BytesRange::unbounded()).await.unwrap();
        assert_eq!(storage_records.len(), 2);
    }

    #[tokio::test]
    async fn should_handle_empty_record() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("empty_key");

        // when
        storage.put(vec![Record::empty(key.clone())]).await.unwrap();
        let result = storage.get(key).await.unwrap();

        // then
        assert_eq!(result.unwrap().value, Bytes::new());
    }
}
