//! An in-process store over a sorted map.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::codec::{decode_value, encode_value};
use crate::error::{Error, Result};
use crate::range::KeyRange;
use crate::store::{
    EntryIterator, KeyIterator, RawCursor, Store, ValueIterator, VecCursor, entries_of, keys_of,
    values_of,
};

/// A dedicated store holding encoded values in a `BTreeMap`.
///
/// Values are kept encoded, so every read decodes a fresh copy. Range
/// queries capture the matching entries under the read lock and iterate
/// that snapshot.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Bytes>>> {
        self.data
            .read()
            .map_err(|e| Error::Internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Bytes>>> {
        self.data
            .write()
            .map_err(|e| Error::Internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn scan(&self, range: &KeyRange) -> Result<RawCursor> {
        let data = self.read()?;
        let entries: Vec<(String, Bytes)> = range
            .walk(data.iter())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Box::new(VecCursor::new(entries)))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let stored = self.read()?.get(key).cloned();
        stored.map(|stored| decode_value(&stored)).transpose()
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let encoded = encode_value(value)?;
        self.write()?.insert(key.to_owned(), encoded);
        Ok(())
    }

    async fn keys(&self, range: KeyRange) -> Result<KeyIterator> {
        Ok(keys_of(self.scan(&range)?))
    }

    async fn values(&self, range: KeyRange) -> Result<ValueIterator> {
        Ok(values_of(self.scan(&range)?))
    }

    async fn entries(&self, range: KeyRange) -> Result<EntryIterator> {
        Ok(entries_of(self.scan(&range)?))
    }
}
