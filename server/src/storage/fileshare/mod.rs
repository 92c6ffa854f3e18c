//! File share backend abstraction
//!
//! Shares hold directories, directories hold files. A file is created with
//! a fixed size and then filled by writing byte ranges into it.

pub mod local_store;
pub mod mock_store;

use async_trait::async_trait;

use crate::error::StorageError;

#[async_trait]
pub trait FileShareStore: Send + Sync {
    /// Create the share if it does not exist yet
    async fn ensure_share(&self, share: &str) -> Result<(), StorageError>;

    /// Create the directory if it does not exist yet. The share must exist.
    async fn ensure_directory(&self, share: &str, directory: &str) -> Result<(), StorageError>;

    /// Create (or truncate) a zero-filled file of `size` bytes
    async fn create_file(&self, share: &str, directory: &str, name: &str, size: u64) -> Result<(), StorageError>;

    /// Write `data` at `offset`. The range must lie inside the file.
    async fn write_range(
        &self,
        share: &str,
        directory: &str,
        name: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError>;
}

/// Rejects names that would escape their parent directory.
pub(crate) fn checked_component(component: &str) -> Result<&str, StorageError> {
    if component.is_empty()
        || component == "."
        || component == ".."
        || component.contains('/')
        || component.contains('\\')
    {
        return Err(StorageError::Backend(format!("invalid path component '{}'", component)));
    }
    Ok(component)
}

pub(crate) fn range_error(offset: u64, len: usize, size: u64) -> StorageError {
    StorageError::Backend(format!(
        "range {}..{} exceeds file size {}",
        offset,
        offset + len as u64,
        size
    ))
}
