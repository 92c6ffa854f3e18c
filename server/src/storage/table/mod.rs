//! Keyed table backend abstraction
//!
//! Records are addressed by table, partition key and row key. Every write
//! assigns a fresh version token (etag); updates must present the token
//! they read, or `*` to skip the check.

pub mod mock_store;
pub mod sqlite_store;

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::error::StorageError;
use crate::model::Record;

/// Version token that matches any stored version
pub const ANY_VERSION: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Stored fields are replaced by the new field set
    Replace,
    /// New fields are merged into the stored ones
    Merge,
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create the table if it does not exist yet
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError>;

    /// Insert a new record. An existing identity is a conflict.
    async fn insert(&self, table: &str, record: Record) -> Result<Record, StorageError>;

    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Record, StorageError>;

    /// Write an existing record guarded by `version`. Never inserts.
    async fn update(&self, table: &str, record: Record, version: &str, mode: UpdateMode) -> Result<Record, StorageError>;

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StorageError>;

    /// Lazily yields every record of the table; each call is a fresh scan.
    fn scan(&self, table: &str) -> BoxStream<'static, Result<Record, StorageError>>;
}

/// Fresh opaque version token for a record about to be written
pub(crate) fn new_etag(record: &Record) -> String {
    let fields = serde_json::to_string(&record.fields).unwrap_or_default();
    let seed = format!("{}|{}|{}|{}", record.partition_key, record.row_key, Uuid::new_v4(), fields);
    format!("W/\"{}\"", hex::encode(md5::compute(seed.as_bytes()).0))
}

pub(crate) fn version_matches(stored: &str, presented: &str) -> bool {
    presented == ANY_VERSION || stored == presented
}
