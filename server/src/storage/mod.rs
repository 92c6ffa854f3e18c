//! Storage Layer Abstraction
//!
//! This module provides an abstraction over the four storage backends the
//! handlers talk to (file share, queue, blob containers, keyed tables),
//! allowing the system to use different implementations (local files and
//! SQLite, in-memory mocks) without affecting higher-level services.

pub mod blob;
pub mod config;
pub mod fileshare;
pub mod queue;
pub mod table;

mod sqlite;

#[cfg(test)]
mod comprehensive_test;

use std::sync::Arc;

use crate::error::StorageError;
use crate::log_context;
use crate::storage::blob::{mock_store::MockBlobStore, BlobStore};
use crate::storage::fileshare::{mock_store::MockFileShare, FileShareStore};
use crate::storage::queue::{mock_store::MockQueueStore, QueueStore};
use crate::storage::table::{mock_store::MockTableStore, TableStore};

/// One implementation of every backend capability set
#[derive(Clone)]
pub struct Backends {
    pub file_share: Arc<dyn FileShareStore>,
    pub queue: Arc<dyn QueueStore>,
    pub blob: Arc<dyn BlobStore>,
    pub table: Arc<dyn TableStore>,
}

impl Backends {
    /// In-memory backends
    pub fn mock(blob_endpoint: &str) -> Self {
        Self {
            file_share: Arc::new(MockFileShare::new()),
            queue: Arc::new(MockQueueStore::new()),
            blob: Arc::new(MockBlobStore::new(blob_endpoint)),
            table: Arc::new(MockTableStore::new()),
        }
    }
}

/// Runs blocking backend work on the blocking thread pool. The caller's
/// logging context travels with it and is restored when `f` returns.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let context = log_context::current();
    tokio::task::spawn_blocking(move || {
        let _mdc = log_mdc::extend_scoped(context);
        f()
    })
    .await
    .map_err(|e| StorageError::backend(format!("blocking task failed: {}", e)))?
}
