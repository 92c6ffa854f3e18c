//! Local filesystem blob containers
//!
//! Layout: `<root>/<container>/<name>` for content,
//! `<root>/<container>/.meta/<name>.json` for blob properties and
//! `<root>/<container>/.container.json` for the access level.

use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::blob::{blob_url, content_md5, BlobContent, BlobStore, PublicAccess};
use crate::storage::fileshare::checked_component;
use crate::storage::run_blocking;

const CONTAINER_FILE: &str = ".container.json";
const META_DIR: &str = ".meta";

#[derive(Debug, Serialize, Deserialize)]
struct ContainerProperties {
    access: PublicAccess,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobProperties {
    content_type: Option<String>,
    content_md5: String,
    size: u64,
}

pub struct LocalBlobStore {
    root: PathBuf,
    endpoint: String,
}

impl LocalBlobStore {
    pub fn new(root: impl AsRef<Path>, endpoint: &str) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Using local blob root: {} (endpoint {})", root.display(), endpoint);
        Ok(Self {
            root,
            endpoint: endpoint.to_string(),
        })
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, StorageError> {
        let container = checked_component(container)?;
        if container.starts_with('.') {
            return Err(StorageError::Backend(format!("invalid container name '{}'", container)));
        }
        Ok(self.root.join(container))
    }
}

fn blob_name(name: &str) -> Result<&str, StorageError> {
    let name = checked_component(name)?;
    if name.starts_with('.') {
        return Err(StorageError::Backend(format!("invalid blob name '{}'", name)));
    }
    Ok(name)
}

fn meta_path(container_path: &Path, name: &str) -> PathBuf {
    container_path.join(META_DIR).join(format!("{}.json", name))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_container(&self, container: &str, access: PublicAccess) -> Result<(), StorageError> {
        let path = self.container_path(container)?;
        let container = container.to_string();
        run_blocking(move || {
            fs::create_dir_all(path.join(META_DIR))?;
            let props_path = path.join(CONTAINER_FILE);
            if !props_path.exists() {
                fs::write(&props_path, serde_json::to_vec(&ContainerProperties { access })?)?;
                info!("Created container {} with access {:?}", container, access);
            }
            Ok(())
        })
        .await
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
        overwrite: bool,
    ) -> Result<String, StorageError> {
        let container_path = self.container_path(container)?;
        let name = blob_name(name)?.to_string();
        let url = blob_url(&self.endpoint, container, &name);
        let container = container.to_string();
        let props = BlobProperties {
            content_type: content_type.map(str::to_string),
            content_md5: content_md5(&data),
            size: data.len() as u64,
        };
        run_blocking(move || {
            if !container_path.join(CONTAINER_FILE).is_file() {
                return Err(StorageError::NotFound(format!("container {}", container)));
            }
            let data_path = container_path.join(&name);
            if !overwrite && data_path.exists() {
                return Err(StorageError::Conflict(format!("blob {}/{}", container, name)));
            }
            fs::write(&data_path, &data)?;
            fs::write(meta_path(&container_path, &name), serde_json::to_vec(&props)?)?;
            info!("Uploaded {} bytes to {}/{} (md5 {})", props.size, container, name, props.content_md5);
            Ok(())
        })
        .await?;
        Ok(url)
    }

    async fn container_access(&self, container: &str) -> Result<PublicAccess, StorageError> {
        let path = self.container_path(container)?.join(CONTAINER_FILE);
        let container = container.to_string();
        run_blocking(move || {
            if !path.is_file() {
                return Err(StorageError::NotFound(format!("container {}", container)));
            }
            let props: ContainerProperties = serde_json::from_slice(&fs::read(path)?)?;
            Ok(props.access)
        })
        .await
    }

    async fn download(&self, container: &str, name: &str) -> Result<BlobContent, StorageError> {
        let container_path = self.container_path(container)?;
        let name = blob_name(name)?.to_string();
        let container = container.to_string();
        run_blocking(move || {
            let data_path = container_path.join(&name);
            if !data_path.is_file() {
                return Err(StorageError::NotFound(format!("blob {}/{}", container, name)));
            }
            let data = Bytes::from(fs::read(data_path)?);
            let props: BlobProperties = serde_json::from_slice(&fs::read(meta_path(&container_path, &name))?)?;
            Ok(BlobContent {
                data,
                content_type: props.content_type,
                content_md5: props.content_md5,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_local_blob_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:9710/blobs").unwrap();

        store.ensure_container("uploads", PublicAccess::Blob).await.unwrap();
        assert_eq!(store.container_access("uploads").await.unwrap(), PublicAccess::Blob);

        let url = store
            .upload("uploads", "id_a.png", Bytes::from_static(b"png"), Some("image/png"), true)
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:9710/blobs/uploads/id_a.png");

        let blob = store.download("uploads", "id_a.png").await.unwrap();
        assert_eq!(blob.data, Bytes::from_static(b"png"));
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
        assert_eq!(blob.content_md5, content_md5(b"png"));

        let url = store
            .upload("uploads", "id_my photo#1.png", Bytes::from_static(b"x"), None, true)
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:9710/blobs/uploads/id_my%20photo%231.png");
        assert_eq!(store.download("uploads", "id_my photo#1.png").await.unwrap().data, Bytes::from_static(b"x"));
    }

    #[actix_web::test]
    async fn test_local_blob_error_cases() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost").unwrap();

        assert!(matches!(
            store.upload("uploads", "x", Bytes::new(), None, true).await,
            Err(StorageError::NotFound(_))
        ));
        store.ensure_container("uploads", PublicAccess::Blob).await.unwrap();
        assert!(store.upload("uploads", "../x", Bytes::new(), None, true).await.is_err());

        store.upload("uploads", "x", Bytes::from_static(b"1"), None, true).await.unwrap();
        assert!(matches!(
            store.upload("uploads", "x", Bytes::from_static(b"2"), None, false).await,
            Err(StorageError::Conflict(_))
        ));
        store.upload("uploads", "x", Bytes::from_static(b"3"), None, true).await.unwrap();
        assert_eq!(store.download("uploads", "x").await.unwrap().data, Bytes::from_static(b"3"));

        assert!(matches!(store.container_access("missing").await, Err(StorageError::NotFound(_))));
        assert!(matches!(store.download("uploads", "nope").await, Err(StorageError::NotFound(_))));
        assert!(store.download("uploads", ".container.json").await.is_err());
    }
}
