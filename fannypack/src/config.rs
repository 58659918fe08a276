//! Configuration for opening a store.

use std::sync::Arc;

use common::StorageConfig;
use common::storage::factory::create_storage;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::namespace::Namespace;
use crate::namespaced::{BatchPolicy, DEFAULT_BATCH_SIZE, NamespacedStore};
use crate::ordered::OrderedStore;
use crate::store::Store;

/// Configuration for [`open`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Physical storage backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// How the store maps onto the physical keyspace.
    #[serde(default)]
    pub layout: Layout,
}

/// How a store maps onto its physical keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layout {
    /// The store owns the whole keyspace and uses the native ordered cursor.
    Dedicated {
        /// Entries prefetched ahead of the consumer; 0 reads on demand.
        #[serde(default)]
        read_ahead: usize,
    },
    /// The store is one namespace of a shared flat keyspace.
    Namespaced {
        name: String,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Dedicated { read_ahead: 0 }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// A layout whose arguments have been checked.
enum Plan {
    Dedicated { read_ahead: usize },
    Namespaced { namespace: Namespace, batch: BatchPolicy },
}

impl Plan {
    fn from_layout(layout: &Layout) -> Result<Self> {
        match layout {
            Layout::Dedicated { read_ahead } => Ok(Plan::Dedicated {
                read_ahead: *read_ahead,
            }),
            Layout::Namespaced { name, batch_size } => Ok(Plan::Namespaced {
                namespace: Namespace::new(name.clone())?,
                batch: BatchPolicy::new(*batch_size)?,
            }),
        }
    }
}

/// Opens the storage described by `config` and builds a store over it.
///
/// The layout is validated before any storage is created.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be initialized, or if a
/// namespaced layout has an invalid name or a zero batch size.
pub async fn open(config: Config) -> Result<Arc<dyn Store>> {
    let plan = Plan::from_layout(&config.layout)?;
    let storage = create_storage(&config.storage).await?;
    let store: Arc<dyn Store> = match plan {
        Plan::Dedicated { read_ahead } => {
            Arc::new(OrderedStore::new(storage).with_read_ahead(read_ahead))
        }
        Plan::Namespaced { namespace, batch } => {
            Arc::new(NamespacedStore::with_namespace(storage, namespace).with_batch_policy(batch))
        }
    };
    tracing::debug!(storage = ?config.storage, "opened store");
    Ok(store)
}
