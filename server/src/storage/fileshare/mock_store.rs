//! In-memory file share for tests

use async_trait::async_trait;
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;
use crate::storage::fileshare::{range_error, FileShareStore};

#[derive(Default)]
struct MockShare {
    directories: HashSet<String>,
    // (directory, name) -> content
    files: HashMap<(String, String), Vec<u8>>,
}

/// Mock implementation of FileShareStore for testing
#[derive(Default)]
pub struct MockFileShare {
    shares: Mutex<HashMap<String, MockShare>>,
}

impl MockFileShare {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MockShare>>, StorageError> {
        self.shares
            .lock()
            .map_err(|_| StorageError::backend("mock file share lock poisoned"))
    }

    pub fn share_exists(&self, share: &str) -> bool {
        self.lock().map(|s| s.contains_key(share)).unwrap_or(false)
    }

    /// Number of files across all shares
    pub fn file_count(&self) -> usize {
        self.lock()
            .map(|s| s.values().map(|share| share.files.len()).sum())
            .unwrap_or(0)
    }

    pub fn file_contents(&self, share: &str, directory: &str, name: &str) -> Option<Vec<u8>> {
        let shares = self.lock().ok()?;
        shares
            .get(share)?
            .files
            .get(&(directory.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl FileShareStore for MockFileShare {
    async fn ensure_share(&self, share: &str) -> Result<(), StorageError> {
        self.lock()?.entry(share.to_string()).or_default();
        Ok(())
    }

    async fn ensure_directory(&self, share: &str, directory: &str) -> Result<(), StorageError> {
        let mut shares = self.lock()?;
        let entry = shares
            .get_mut(share)
            .ok_or_else(|| StorageError::NotFound(format!("share {}", share)))?;
        entry.directories.insert(directory.to_string());
        Ok(())
    }

    async fn create_file(&self, share: &str, directory: &str, name: &str, size: u64) -> Result<(), StorageError> {
        let mut shares = self.lock()?;
        let entry = shares
            .get_mut(share)
            .ok_or_else(|| StorageError::NotFound(format!("share {}", share)))?;
        if !entry.directories.contains(directory) {
            return Err(StorageError::NotFound(format!("directory {}/{}", share, directory)));
        }
        entry
            .files
            .insert((directory.to_string(), name.to_string()), vec![0u8; size as usize]);
        info!("Mock: Created file {}/{}/{} with size {}", share, directory, name, size);
        Ok(())
    }

    async fn write_range(
        &self,
        share: &str,
        directory: &str,
        name: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let mut shares = self.lock()?;
        let file = shares
            .get_mut(share)
            .and_then(|s| s.files.get_mut(&(directory.to_string(), name.to_string())))
            .ok_or_else(|| StorageError::NotFound(format!("file {}/{}/{}", share, directory, name)))?;
        let end = offset as usize + data.len();
        if end > file.len() {
            return Err(range_error(offset, data.len(), file.len() as u64));
        }
        file[offset as usize..end].copy_from_slice(data);
        info!("Mock: Wrote {} bytes at offset {} to {}/{}/{}", data.len(), offset, share, directory, name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_mock_file_share_basic_operations() {
        let store = MockFileShare::new();
        assert!(!store.share_exists("files"));

        store.ensure_share("files").await.unwrap();
        store.ensure_share("files").await.unwrap();
        store.ensure_directory("files", "logs").await.unwrap();
        store.create_file("files", "logs", "a.txt", 5).await.unwrap();
        store.write_range("files", "logs", "a.txt", 1, b"bcd").await.unwrap();

        assert_eq!(store.file_contents("files", "logs", "a.txt").unwrap(), b"\0bcd\0");
        assert_eq!(store.file_count(), 1);
    }

    #[actix_web::test]
    async fn test_mock_file_share_error_cases() {
        let store = MockFileShare::new();
        assert!(matches!(
            store.ensure_directory("missing", "logs").await,
            Err(StorageError::NotFound(_))
        ));

        store.ensure_share("files").await.unwrap();
        assert!(matches!(
            store.create_file("files", "logs", "a.txt", 1).await,
            Err(StorageError::NotFound(_))
        ));

        store.ensure_directory("files", "logs").await.unwrap();
        store.create_file("files", "logs", "a.txt", 2).await.unwrap();
        assert!(matches!(
            store.write_range("files", "logs", "a.txt", 1, b"xy").await,
            Err(StorageError::Backend(_))
        ));
    }
}
