//! Uploads into a public-read blob container and anonymous reads back out

use log::info;
use std::sync::Arc;

use crate::error::StorageError;
use crate::model::BlobObject;
use crate::storage::blob::{BlobContent, BlobStore, PublicAccess};

pub struct BlobService {
    store: Arc<dyn BlobStore>,
}

impl BlobService {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Store the object, replacing any blob of the same name, and return its URL
    pub async fn upload_blob(&self, blob: BlobObject) -> Result<String, StorageError> {
        let size = blob.data.len();
        self.store.ensure_container(&blob.container, PublicAccess::Blob).await?;
        let url = self
            .store
            .upload(&blob.container, &blob.name, blob.data, blob.content_type.as_deref(), true)
            .await?;
        info!("Uploaded {} bytes to {}", size, url);
        Ok(url)
    }

    /// Read a blob anonymously. Blobs in private containers do not exist
    /// to anonymous readers.
    pub async fn read_public_blob(&self, container: &str, name: &str) -> Result<BlobContent, StorageError> {
        if self.store.container_access(container).await? == PublicAccess::None {
            return Err(StorageError::NotFound(format!("blob {}/{}", container, name)));
        }
        self.store.download(container, name).await
    }
}
