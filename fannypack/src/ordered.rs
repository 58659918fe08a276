//! A dedicated store over an ordered physical storage.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::{BytesRange, Record, RecordOp, Storage, StorageIterator};
use serde_json::Value;

use crate::codec::{decode_key, decode_value, encode_value};
use crate::cursor::ChannelCursor;
use crate::error::Result;
use crate::range::KeyRange;
use crate::store::{
    Cursor, EntryIterator, KeyIterator, RawCursor, Store, ValueIterator, entries_of, keys_of,
    values_of,
};

/// A store that owns the whole keyspace of a [`Storage`].
///
/// Range bounds are handed to the storage's native cursor, so only keys
/// inside the range are ever read. With a non-zero read-ahead, the cursor
/// is drained on a background task into a bounded buffer.
pub struct OrderedStore {
    storage: Arc<dyn Storage>,
    read_ahead: usize,
}

impl OrderedStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            read_ahead: 0,
        }
    }

    /// Prefetches up to `depth` entries ahead of the consumer. Zero disables it.
    pub fn with_read_ahead(mut self, depth: usize) -> Self {
        self.read_ahead = depth;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    async fn scan(&self, range: &KeyRange) -> Result<RawCursor> {
        let iter = self.storage.scan_iter(range.to_bytes_range()).await?;
        let cursor = RecordCursor { iter };
        if self.read_ahead > 0 {
            Ok(Box::new(ChannelCursor::spawn(cursor, self.read_ahead)))
        } else {
            Ok(Box::new(cursor))
        }
    }
}

#[async_trait]
impl Store for OrderedStore {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn clear(&self) -> Result<()> {
        let records = self.storage.scan(BytesRange::unbounded()).await?;
        let count = records.len();
        let ops = records
            .into_iter()
            .map(|record| RecordOp::Delete(record.key))
            .collect();
        self.storage.apply(ops).await?;
        tracing::debug!(count, "cleared store");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .apply(vec![RecordOp::Delete(Bytes::copy_from_slice(key.as_bytes()))])
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let record = self
            .storage
            .get(Bytes::copy_from_slice(key.as_bytes()))
            .await?;
        record.map(|record| decode_value(&record.value)).transpose()
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let record = self
            .storage
            .get(Bytes::copy_from_slice(key.as_bytes()))
            .await?;
        Ok(record.is_some())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let record = Record::new(Bytes::copy_from_slice(key.as_bytes()), encode_value(value)?);
        self.storage.put(vec![record]).await?;
        Ok(())
    }

    async fn keys(&self, range: KeyRange) -> Result<KeyIterator> {
        Ok(keys_of(self.scan(&range).await?))
    }

    async fn values(&self, range: KeyRange) -> Result<ValueIterator> {
        Ok(values_of(self.scan(&range).await?))
    }

    async fn entries(&self, range: KeyRange) -> Result<EntryIterator> {
        Ok(entries_of(self.scan(&range).await?))
    }

    async fn close(&self) -> Result<()> {
        self.storage.flush().await?;
        self.storage.close().await?;
        tracing::debug!("closed ordered store");
        Ok(())
    }
}

/// Adapts a native storage iterator to raw entries.
struct RecordCursor {
    iter: Box<dyn StorageIterator + Send + 'static>,
}

#[async_trait]
impl Cursor for RecordCursor {
    type Item = (String, Bytes);

    async fn next(&mut self) -> Result<Option<(String, Bytes)>> {
        match self.iter.next().await? {
            Some(record) => Ok(Some((decode_key(&record.key)?, record.value))),
            None => Ok(None),
        }
    }
}
