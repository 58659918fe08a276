//! Storage factory for creating storage instances from configuration.
//!
//! This module provides factory functions for creating storage backends
//! based on configuration, supporting both InMemory and SlateDB backends.

use std::sync::Arc;

use slatedb::DbBuilder;
use slatedb::config::Settings;
use slatedb::object_store::{self, ObjectStore};

use super::config::{ObjectStoreConfig, SlateDbStorageConfig, StorageConfig};
use super::in_memory::InMemoryStorage;
use super::slate::SlateDbStorage;
use super::{Storage, StorageError, StorageResult};

/// Creates an object store from configuration without initializing SlateDB.
pub fn create_object_store(config: &ObjectStoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        ObjectStoreConfig::InMemory => Ok(Arc::new(object_store::memory::InMemory::new())),
        ObjectStoreConfig::Local(local_config) => {
            std::fs::create_dir_all(&local_config.path).map_err(|e| {
                StorageError::Storage(format!(
                    "Failed to create storage directory '{}': {}",
                    local_config.path, e
                ))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(&local_config.path)
                .map_err(|e| {
                    StorageError::Storage(format!("Failed to create local filesystem store: {}", e))
                })?;
            Ok(Arc::new(store))
        }
    }
}

/// Creates a storage instance based on the provided configuration.
///
/// # Returns
///
/// Returns an `Arc<dyn Storage>` on success, or a `StorageError` on failure.
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config {
        StorageConfig::InMemory => Ok(Arc::new(InMemoryStorage::new())),
        StorageConfig::SlateDb(slate_config) => {
            let storage = create_slatedb_storage(slate_config).await?;
            Ok(Arc::new(storage))
        }
    }
}

async fn create_slatedb_storage(config: &SlateDbStorageConfig) -> StorageResult<SlateDbStorage> {
    let object_store = create_object_store(&config.object_store)?;

    let settings = match &config.settings_path {
        Some(path) => Settings::from_file(path).map_err(|e| {
            StorageError::Storage(format!(
                "Failed to load SlateDB settings from {}: {}",
                path, e
            ))
        })?,
        None => Settings::load().unwrap_or_default(),
    };

    let db = DbBuilder::new(config.path.clone(), object_store)
        .with_settings(settings)
        .build()
        .await
        .map_err(|e| StorageError::Storage(format!("Failed to create SlateDB: {}", e)))?;

    tracing::debug!(path = %config.path, "opened slatedb storage");
    Ok(SlateDbStorage::new(Arc::new(db)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::config::LocalObjectStoreConfig;

    #[tokio::test]
    async fn should_create_in_memory_storage() {
        // when
        let storage = create_storage(&StorageConfig::InMemory).await;

        // then
        assert!(storage.is_ok());
    }

    #[tokio::test]
    async fn should_fail_when_settings_file_is_missing() {
        // given
        let config = StorageConfig::SlateDb(SlateDbStorageConfig {
            path: "db".to_string(),
            object_store: ObjectStoreConfig::InMemory,
            settings_path: Some("/nonexistent/fanny-pack/settings.toml".to_string()),
        });

        // when
        let result = create_storage(&config).await;

        // then
        match result {
            Err(StorageError::Storage(msg)) => {
                assert!(msg.contains("Failed to load SlateDB settings"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected settings load failure"),
        }
    }

    #[test]
    fn should_create_local_object_store_directory() {
        // given
        let dir = std::env::temp_dir().join(format!("fanny-pack-store-{}", std::process::id()));
        let config = ObjectStoreConfig::Local(LocalObjectStoreConfig {
            path: dir.to_string_lossy().into_owned(),
        });

        // when
        let store = create_object_store(&config);

        // then
        assert!(store.is_ok());
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
