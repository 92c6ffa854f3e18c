//! Storage connection string parsing and backend construction
//!
//! Format: semicolon separated `Key=Value` pairs, keys case-insensitive:
//! `Backend=Local;Root=./data;BlobEndpoint=http://127.0.0.1:9710/blobs`.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::error::StorageError;
use crate::storage::blob::local_store::LocalBlobStore;
use crate::storage::fileshare::local_store::LocalFileShare;
use crate::storage::queue::sqlite_store::SqliteQueueStore;
use crate::storage::table::sqlite_store::SqliteTableStore;
use crate::storage::Backends;

const DEFAULT_ROOT: &str = "./data";
const DEFAULT_BLOB_ENDPOINT: &str = "http://127.0.0.1:9710/blobs";
const DATABASE_FILE: &str = "storage.sqlite";

/// Available storage backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "localfs" | "sqlite" => Ok(StorageBackend::Local),
            "mock" | "memory" => Ok(StorageBackend::Mock),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

/// Parsed storage connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub backend: StorageBackend,
    pub root: PathBuf,
    pub blob_endpoint: String,
}

impl ConnectionSettings {
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        if connection_string.trim().is_empty() {
            return Err(ConfigError::MissingConnectionString);
        }

        let mut settings = Self {
            backend: StorageBackend::default(),
            root: PathBuf::from(DEFAULT_ROOT),
            blob_endpoint: DEFAULT_BLOB_ENDPOINT.to_string(),
        };
        for pair in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidConnectionString(format!("'{}' is not Key=Value", pair)))?;
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "backend" => {
                    settings.backend = value.parse().map_err(ConfigError::InvalidConnectionString)?;
                }
                "root" => settings.root = PathBuf::from(value),
                "blobendpoint" => settings.blob_endpoint = value.to_string(),
                other => warn!("Ignoring unknown connection string key: {}", other),
            }
        }
        Ok(settings)
    }

    /// Create the storage backends based on the settings
    pub fn create_backends(&self) -> Result<Backends, StorageError> {
        match self.backend {
            StorageBackend::Mock => {
                info!("Using mock storage backends");
                Ok(Backends::mock(&self.blob_endpoint))
            }
            StorageBackend::Local => {
                info!("Using local storage backends under {}", self.root.display());
                std::fs::create_dir_all(&self.root)?;
                let database = self.root.join(DATABASE_FILE);
                Ok(Backends {
                    file_share: Arc::new(LocalFileShare::new(self.root.join("files"))?),
                    queue: Arc::new(SqliteQueueStore::open(&database)?),
                    blob: Arc::new(LocalBlobStore::new(self.root.join("blobs"), &self.blob_endpoint)?),
                    table: Arc::new(SqliteTableStore::open(&database)?),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("mock".parse::<StorageBackend>().unwrap(), StorageBackend::Mock);
        assert_eq!("MOCK".parse::<StorageBackend>().unwrap(), StorageBackend::Mock);

        assert!("azure".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_connection_string() {
        let settings =
            ConnectionSettings::parse("Backend=Mock; Root=/srv/data ;BlobEndpoint=http://cdn/b;").unwrap();
        assert_eq!(settings.backend, StorageBackend::Mock);
        assert_eq!(settings.root, PathBuf::from("/srv/data"));
        assert_eq!(settings.blob_endpoint, "http://cdn/b");

        let defaults = ConnectionSettings::parse("root=./x").unwrap();
        assert_eq!(defaults.backend, StorageBackend::Local);
        assert_eq!(defaults.blob_endpoint, DEFAULT_BLOB_ENDPOINT);
    }

    #[test]
    fn test_parse_connection_string_errors() {
        assert_eq!(ConnectionSettings::parse("  "), Err(ConfigError::MissingConnectionString));
        assert!(matches!(
            ConnectionSettings::parse("Backend"),
            Err(ConfigError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionSettings::parse("Backend=Azure"),
            Err(ConfigError::InvalidConnectionString(_))
        ));
    }

    #[test]
    fn test_create_backends() {
        let mock = ConnectionSettings::parse("Backend=Mock").unwrap();
        assert!(mock.create_backends().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let local = ConnectionSettings::parse(&format!("Backend=Local;Root={}", dir.path().display())).unwrap();
        assert!(local.create_backends().is_ok());
        assert!(dir.path().join(DATABASE_FILE).exists());
        assert!(dir.path().join("files").is_dir());
        assert!(dir.path().join("blobs").is_dir());
    }
}
