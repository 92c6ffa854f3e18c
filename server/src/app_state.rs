//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.
//! Storage configuration is resolved once here; a missing or broken
//! connection string is kept as an error so every handler can answer it
//! without touching a backend.

use log::{error, info};
use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::error::HandlerError;
use crate::service::{BlobService, FileService, QueueService, TableService};
use crate::storage::config::ConnectionSettings;
use crate::storage::Backends;

/// Services bound to one set of backends
#[derive(Clone)]
pub struct Services {
    pub files: Arc<FileService>,
    pub queues: Arc<QueueService>,
    pub blobs: Arc<BlobService>,
    pub tables: Arc<TableService>,
}

impl Services {
    pub fn new(backends: Backends) -> Self {
        Self {
            files: Arc::new(FileService::new(backends.file_share)),
            queues: Arc::new(QueueService::new(backends.queue)),
            blobs: Arc::new(BlobService::new(backends.blob)),
            tables: Arc::new(TableService::new(backends.table)),
        }
    }
}

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    services: Result<Services, ConfigError>,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Self {
        info!("Initializing application state with configuration");
        let services = Self::open_services(&config);
        match &services {
            Ok(_) => info!("Application state initialized successfully"),
            Err(e) => error!("Storage is unavailable, every request will fail: {}", e),
        }
        Self { config, services }
    }

    fn open_services(config: &AppConfig) -> Result<Services, ConfigError> {
        let connection_string = config
            .storage
            .connection_string
            .as_deref()
            .ok_or(ConfigError::MissingConnectionString)?;
        let settings = ConnectionSettings::parse(connection_string)?;
        let backends = settings
            .create_backends()
            .map_err(|e| ConfigError::Backend(e.to_string()))?;
        Ok(Services::new(backends))
    }

    /// Application state over explicitly supplied backends
    pub fn with_backends(config: AppConfig, backends: Backends) -> Self {
        Self {
            config,
            services: Ok(Services::new(backends)),
        }
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        Self::with_backends(AppConfig::default(), Backends::mock("http://127.0.0.1:10000/devstoreaccount1"))
    }

    /// The services, or the configuration error every handler answers with
    pub fn services(&self) -> Result<&Services, HandlerError> {
        self.services
            .as_ref()
            .map_err(|e| HandlerError::Configuration(e.to_string()))
    }
}
