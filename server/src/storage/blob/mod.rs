//! Blob container backend abstraction

pub mod local_store;
pub mod mock_store;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Anonymous read access granted on a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicAccess {
    /// Private container
    None,
    /// Anonymous read of individual blobs
    Blob,
    /// Anonymous read and listing of the container
    Container,
}

/// Stored blob content with its properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub content_md5: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container with `access` if it does not exist yet. An
    /// existing container keeps its access level.
    async fn ensure_container(&self, container: &str, access: PublicAccess) -> Result<(), StorageError>;

    /// Store `data` under `name` and return the blob's URL. Without
    /// `overwrite`, an existing blob is a conflict.
    async fn upload(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
        overwrite: bool,
    ) -> Result<String, StorageError>;

    /// Access level of an existing container
    async fn container_access(&self, container: &str) -> Result<PublicAccess, StorageError>;

    async fn download(&self, container: &str, name: &str) -> Result<BlobContent, StorageError>;
}

// RFC 3986 unreserved characters stay as they are.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub(crate) fn blob_url(endpoint: &str, container: &str, name: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        utf8_percent_encode(container, PATH_SEGMENT),
        utf8_percent_encode(name, PATH_SEGMENT)
    )
}

/// Hex MD5 of blob content, kept alongside each stored blob
pub(crate) fn content_md5(data: &[u8]) -> String {
    hex::encode(md5::compute(data).0)
}
