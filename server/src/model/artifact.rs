//! Write-once objects: text files on the file share and uploaded blobs

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Free-form text written once to a fixed directory of the file share
#[derive(Debug, Clone, PartialEq)]
pub struct TextArtifact {
    pub share: String,
    pub directory: String,
    pub name: String,
    pub content: String,
}

impl TextArtifact {
    pub fn new(share: &str, directory: &str, content: String, now: DateTime<Utc>) -> Self {
        Self {
            share: share.to_string(),
            directory: directory.to_string(),
            name: Self::generate_name(now),
            content,
        }
    }

    /// `log_<YYYYMMDDHHMMSS>_<8 hex>.txt`; the suffix separates writes
    /// landing in the same second.
    pub fn generate_name(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("log_{}_{}.txt", now.format("%Y%m%d%H%M%S"), &suffix[..8])
    }

    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.share, self.directory, self.name)
    }
}

/// Uploaded file bound for a blob container
#[derive(Debug, Clone, PartialEq)]
pub struct BlobObject {
    pub container: String,
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl BlobObject {
    /// Builds the blob under a fresh `<uuid>_<file name>` name.
    pub fn new(container: &str, file_name: &str, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            container: container.to_string(),
            name: format!("{}_{}", Uuid::new_v4(), base_file_name(file_name)),
            content_type,
            data,
        }
    }
}

/// Strips any client-side directory part from an uploaded file name.
pub fn base_file_name(file_name: &str) -> &str {
    file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
}
