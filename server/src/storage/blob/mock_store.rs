//! In-memory blob containers for tests

use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;
use crate::storage::blob::{blob_url, content_md5, BlobContent, BlobStore, PublicAccess};

struct MockContainer {
    access: PublicAccess,
    blobs: HashMap<String, BlobContent>,
}

/// Mock implementation of BlobStore for testing
pub struct MockBlobStore {
    endpoint: String,
    containers: Mutex<HashMap<String, MockContainer>>,
}

impl MockBlobStore {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            containers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MockContainer>>, StorageError> {
        self.containers
            .lock()
            .map_err(|_| StorageError::backend("mock blob lock poisoned"))
    }

    pub fn blob_count(&self) -> usize {
        self.lock()
            .map(|c| c.values().map(|container| container.blobs.len()).sum())
            .unwrap_or(0)
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new("http://127.0.0.1:10000/mock")
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn ensure_container(&self, container: &str, access: PublicAccess) -> Result<(), StorageError> {
        self.lock()?
            .entry(container.to_string())
            .or_insert_with(|| MockContainer {
                access,
                blobs: HashMap::new(),
            });
        Ok(())
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
        overwrite: bool,
    ) -> Result<String, StorageError> {
        let mut containers = self.lock()?;
        let entry = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(format!("container {}", container)))?;
        if !overwrite && entry.blobs.contains_key(name) {
            return Err(StorageError::Conflict(format!("blob {}/{}", container, name)));
        }
        info!("Mock: Uploaded {} bytes to {}/{}", data.len(), container, name);
        entry.blobs.insert(
            name.to_string(),
            BlobContent {
                content_md5: content_md5(&data),
                content_type: content_type.map(str::to_string),
                data,
            },
        );
        Ok(blob_url(&self.endpoint, container, name))
    }

    async fn container_access(&self, container: &str) -> Result<PublicAccess, StorageError> {
        self.lock()?
            .get(container)
            .map(|c| c.access)
            .ok_or_else(|| StorageError::NotFound(format!("container {}", container)))
    }

    async fn download(&self, container: &str, name: &str) -> Result<BlobContent, StorageError> {
        self.lock()?
            .get(container)
            .and_then(|c| c.blobs.get(name))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("blob {}/{}", container, name)))
    }
}
