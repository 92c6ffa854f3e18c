//! Text artifacts on the file share

use log::info;
use std::sync::Arc;

use crate::error::StorageError;
use crate::model::TextArtifact;
use crate::storage::fileshare::FileShareStore;

pub struct FileService {
    store: Arc<dyn FileShareStore>,
}

impl FileService {
    pub fn new(store: Arc<dyn FileShareStore>) -> Self {
        Self { store }
    }

    /// Write the artifact as a new file and return its `share/dir/name` path
    pub async fn append_text_artifact(&self, artifact: &TextArtifact) -> Result<String, StorageError> {
        let data = artifact.content.as_bytes();
        self.store.ensure_share(&artifact.share).await?;
        self.store.ensure_directory(&artifact.share, &artifact.directory).await?;
        self.store
            .create_file(&artifact.share, &artifact.directory, &artifact.name, data.len() as u64)
            .await?;
        self.store
            .write_range(&artifact.share, &artifact.directory, &artifact.name, 0, data)
            .await?;

        let path = artifact.path();
        info!("Wrote {} bytes to {}", data.len(), path);
        Ok(path)
    }
}
