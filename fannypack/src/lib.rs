//! Fanny Pack - ordered JSON key-value stores behind one contract.
//!
//! Fanny Pack exposes heterogeneous key-value backends through a single
//! [`Store`] trait: string keys kept in code point order, JSON values, point
//! operations and range-bounded, lazily pulled iteration.
//!
//! # Architecture
//!
//! Range queries are driven by a [`KeyRange`] predicate over an ascending key
//! sequence. Stores that share one flat physical keyspace confine themselves
//! to a [`Namespace`], whose filter composes the key prefix with the range so
//! that no namespace ever sees its siblings' keys. Values are stored as JSON
//! text and decoded into fresh copies on every read.
//!
//! # Key Concepts
//!
//! - **MemoryStore**: a dedicated in-process sorted map.
//! - **OrderedStore**: a dedicated store over a [`common::Storage`] with a
//!   native ordered cursor, optionally prefetching on a background task.
//! - **NamespacedStore**: one namespace of a shared [`common::Storage`],
//!   fetching values in batches set by a [`BatchPolicy`].
//! - **RangeIterator**: the pull-based sequence returned by `keys`, `values`
//!   and `entries`.
//!
//! # Example
//!
//! ```ignore
//! use fannypack::{Config, KeyRange, Store, open};
//! use serde_json::json;
//!
//! let store = open(Config::default()).await?;
//!
//! store.set("a", &json!(1)).await?;
//! store.set("b", &json!(2)).await?;
//! store.set("c", &json!(3)).await?;
//!
//! let range = KeyRange::builder().gt("a").lt("c").build()?;
//! let mut entries = store.entries(range).await?;
//! while let Some((key, value)) = entries.next().await? {
//!     println!("{}: {}", key, value);
//! }
//!
//! store.close().await?;
//! ```

mod codec;
mod config;
mod cursor;
mod error;
mod memory;
mod namespace;
mod namespaced;
mod ordered;
mod range;
mod store;

pub use common::{ObjectStoreConfig, StorageConfig};
pub use codec::{decode, decode_value, encode, encode_value};
pub use config::{Config, Layout, open};
pub use cursor::{ChannelCursor, CursorSender, channel};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use namespace::{FilterKeys, Namespace};
pub use namespaced::{BatchPolicy, DEFAULT_BATCH_SIZE, NamespacedStore};
pub use ordered::OrderedStore;
pub use range::{KeyOf, KeyRange, KeyRangeBuilder, RangeWalk};
pub use store::{
    Cursor, Entry, EntryIterator, KeyIterator, RangeIterator, Store, StoreExt, ValueIterator,
    VecCursor,
};
