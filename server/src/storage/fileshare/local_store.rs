//! Local filesystem file share

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::storage::fileshare::{checked_component, range_error, FileShareStore};
use crate::storage::run_blocking;

// Serializes create/write on share files within this process
lazy_static! {
    static ref SHARE_WRITE_LOCK: Mutex<()> = Mutex::new(());
}

/// File share rooted at a local directory: `<root>/<share>/<directory>/<name>`
pub struct LocalFileShare {
    root: PathBuf,
}

impl LocalFileShare {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Using local file share root: {}", root.display());
        Ok(Self { root })
    }

    fn share_path(&self, share: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(checked_component(share)?))
    }

    fn file_path(&self, share: &str, directory: &str, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .share_path(share)?
            .join(checked_component(directory)?)
            .join(checked_component(name)?))
    }
}

#[async_trait]
impl FileShareStore for LocalFileShare {
    async fn ensure_share(&self, share: &str) -> Result<(), StorageError> {
        let path = self.share_path(share)?;
        run_blocking(move || {
            fs::create_dir_all(&path)?;
            debug!("Share ready at {}", path.display());
            Ok(())
        })
        .await
    }

    async fn ensure_directory(&self, share: &str, directory: &str) -> Result<(), StorageError> {
        let share_path = self.share_path(share)?;
        let dir_path = share_path.join(checked_component(directory)?);
        let share = share.to_string();
        run_blocking(move || {
            if !share_path.is_dir() {
                return Err(StorageError::NotFound(format!("share {}", share)));
            }
            fs::create_dir_all(dir_path)?;
            Ok(())
        })
        .await
    }

    async fn create_file(&self, share: &str, directory: &str, name: &str, size: u64) -> Result<(), StorageError> {
        let path = self.file_path(share, directory, name)?;
        let location = format!("{}/{}", share, directory);
        run_blocking(move || {
            if !path.parent().map(Path::is_dir).unwrap_or(false) {
                return Err(StorageError::NotFound(format!("directory {}", location)));
            }
            let _guard = SHARE_WRITE_LOCK
                .lock()
                .map_err(|_| StorageError::backend("share write lock poisoned"))?;
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            file.set_len(size)?;
            info!("Created {} with size {}", path.display(), size);
            Ok(())
        })
        .await
    }

    async fn write_range(
        &self,
        share: &str,
        directory: &str,
        name: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.file_path(share, directory, name)?;
        let location = format!("{}/{}/{}", share, directory, name);
        let data = data.to_vec();
        run_blocking(move || {
            let _guard = SHARE_WRITE_LOCK
                .lock()
                .map_err(|_| StorageError::backend("share write lock poisoned"))?;
            let mut file = match OpenOptions::new().write(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(StorageError::NotFound(format!("file {}", location)))
                }
                Err(e) => return Err(e.into()),
            };
            let size = file.metadata()?.len();
            if offset + data.len() as u64 > size {
                return Err(range_error(offset, data.len(), size));
            }
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&data)?;
            file.flush()?;
            debug!("Wrote {} bytes at offset {} to {}", data.len(), offset, path.display());
            Ok(())
        })
        .await
    }
}
