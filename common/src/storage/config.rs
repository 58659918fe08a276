//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects the physical storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Process-local `BTreeMap`, lost when the storage is dropped.
    #[default]
    InMemory,
    /// Embedded SlateDB database.
    SlateDb(SlateDbStorageConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateDbStorageConfig {
    /// Path prefix of the database inside the object store.
    pub path: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file. When absent, settings are loaded from
    /// the environment, falling back to SlateDB's defaults.
    #[serde(default)]
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectStoreConfig {
    /// Root directory, created if missing.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_default_to_in_memory() {
        assert_eq!(StorageConfig::default(), StorageConfig::InMemory);
    }

    #[test]
    fn should_deserialize_slatedb_config_with_defaults() {
        // given
        let raw = json!({ "type": "SlateDb", "path": "data/fanny-pack" });

        // when
        let config: StorageConfig = serde_json::from_value(raw).unwrap();

        // then
        assert_eq!(
            config,
            StorageConfig::SlateDb(SlateDbStorageConfig {
                path: "data/fanny-pack".to_string(),
                object_store: ObjectStoreConfig::InMemory,
                settings_path: None,
            })
        );
    }

    #[test]
    fn should_deserialize_local_object_store() {
        // given
        let raw = json!({
            "type": "SlateDb",
            "path": "db",
            "object_store": { "type": "Local", "path": "/tmp/fanny-pack" }
        });

        // when
        let config: StorageConfig = serde_json::from_value(raw).unwrap();

        // then
        match config {
            StorageConfig::SlateDb(slate) => assert_eq!(
                slate.object_store,
                ObjectStoreConfig::Local(LocalObjectStoreConfig {
                    path: "/tmp/fanny-pack".to_string()
                })
            ),
            other => panic!("unexpected config: {:?}", other),
        }
    }
}
