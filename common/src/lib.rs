pub mod bytes;
pub mod storage;

pub use bytes::BytesRange;
pub use storage::config::{LocalObjectStoreConfig, ObjectStoreConfig, StorageConfig};
pub use storage::{
    Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead, StorageResult,
    StorageSnapshot, WriteOptions,
};
