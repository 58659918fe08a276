//! SlateDB-backed storage.

use std::sync::Arc;

use std::ops::Bound::{Excluded, Included, Unbounded};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use slatedb::{Db, DbIterator, DbSnapshot, WriteBatch};

use super::{RecordOp, Storage, StorageSnapshot, WriteOptions};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// Storage over an embedded SlateDB database.
pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

/// Leading byte of every physical SlateDB key.
///
/// SlateDB rejects empty keys and empty range bounds, so each record key is
/// stored behind this tag. The tag is constant, which keeps byte order.
const KEY_TAG: u8 = 0x00;

fn tagged(key: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(key.len() + 1);
    buf.put_u8(KEY_TAG);
    buf.put_slice(key);
    buf.freeze()
}

fn untagged(key: Bytes) -> StorageResult<Bytes> {
    match key.first() {
        Some(&KEY_TAG) => Ok(key.slice(1..)),
        _ => Err(StorageError::Internal(format!(
            "SlateDB key {:?} is missing its tag byte",
            key
        ))),
    }
}

/// Maps a record range onto tagged physical keys. Returns `None` when the
/// range matches nothing.
fn tagged_range(range: &BytesRange) -> Option<BytesRange> {
    let start = match &range.start {
        Included(key) => Included(tagged(key)),
        Excluded(key) => Excluded(tagged(key)),
        Unbounded => Included(Bytes::from_static(&[KEY_TAG])),
    };
    let end = match &range.end {
        Included(key) => Included(tagged(key)),
        Excluded(key) => Excluded(tagged(key)),
        Unbounded => Excluded(Bytes::from_static(&[KEY_TAG + 1])),
    };
    let physical = BytesRange::new(start, end);
    (!physical.is_empty()).then_some(physical)
}

fn slate_write_options(options: &WriteOptions) -> slatedb::config::WriteOptions {
    slatedb::config::WriteOptions {
        await_durable: options.await_durable,
    }
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&tagged(&key))
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let Some(range) = tagged_range(&range) else {
            return Ok(Box::new(EmptyIterator));
        };
        let iter = self
            .db
            .scan::<Bytes, _>(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { iter }))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                RecordOp::Put(record) => batch.put(&tagged(&record.key), &record.value),
                RecordOp::Delete(key) => batch.delete(&tagged(&key)),
            }
        }
        self.db
            .write_with_options(batch, &slate_write_options(&WriteOptions::default()))
            .await
            .map_err(StorageError::from_storage)
    }

    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for record in records {
            batch.put(&tagged(&record.key), &record.value);
        }
        self.db
            .write_with_options(batch, &slate_write_options(&options))
            .await
            .map_err(StorageError::from_storage)
    }

    async fn snapshot(&self) -> StorageResult<Arc<dyn StorageSnapshot>> {
        let snapshot = self
            .db
            .snapshot()
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Arc::new(SlateDbStorageSnapshot { snapshot }))
    }

    async fn flush(&self) -> StorageResult<()> {
        self.db.flush().await.map_err(StorageError::from_storage)
    }

    async fn close(&self) -> StorageResult<()> {
        self.db.close().await.map_err(StorageError::from_storage)
    }
}

/// Read-only view of a SlateDB snapshot.
pub struct SlateDbStorageSnapshot {
    snapshot: Arc<DbSnapshot>,
}

#[async_trait]
impl StorageRead for SlateDbStorageSnapshot {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .snapshot
            .get(&tagged(&key))
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let Some(range) = tagged_range(&range) else {
            return Ok(Box::new(EmptyIterator));
        };
        let iter = self
            .snapshot
            .scan::<Bytes, _>(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { iter }))
    }
}

#[async_trait]
impl StorageSnapshot for SlateDbStorageSnapshot {}

struct SlateDbIterator {
    iter: DbIterator,
}

#[async_trait]
impl StorageIterator for SlateDbIterator {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        let next = self
            .iter
            .next()
            .await
            .map_err(StorageError::from_storage)?;
        match next {
            Some(kv) => Ok(Some(Record::new(untagged(kv.key)?, kv.value))),
            None => Ok(None),
        }
    }
}

struct EmptyIterator;

#[async_trait]
impl StorageIterator for EmptyIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(None)
    }
}
