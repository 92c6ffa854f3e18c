//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting a YAML configuration file with sensible defaults and a few
//! environment overrides. Configuration is resolved once at startup and
//! injected into the handlers through `AppState`.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the storage connection string
pub const CONNECTION_STRING_ENV: &str = "STORAGE_CONNECTION_STRING";
/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "APP_CONFIG";
const SERVER_PORT_ENV: &str = "SERVER_PORT";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config file: {0}")]
    Yaml(String),

    #[error("storage connection string is not set")]
    MissingConnectionString,

    #[error("invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("failed to open storage backends: {0}")]
    Backend(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage connection configuration
    pub storage: StorageConfig,
    /// Names of the share, queue, container and table the handlers use
    pub resources: ResourceConfig,
    /// Upload rules for the blob endpoint
    pub upload: UploadConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum request body size in bytes
    pub max_payload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 64 * 1024 * 1024,
        }
    }
}

/// Storage connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `Backend=Local|Mock;Root=<dir>;BlobEndpoint=<url>`
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub file_share: String,
    pub file_directory: String,
    pub queue_name: String,
    pub blob_container: String,
    pub table_name: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            file_share: "files".to_string(),
            file_directory: "logs".to_string(),
            queue_name: "orders".to_string(),
            blob_container: "uploads".to_string(),
            table_name: "Products".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Multipart field carrying the file
    pub form_field: String,
    pub max_file_bytes: u64,
    /// Accepted content types; empty accepts everything
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            form_field: "file".to_string(),
            max_file_bytes: 50 * 1024 * 1024,
            allowed_content_types: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, use defaults if not found, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let config = Self::from_yaml(&content)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(connection_string) = env::var(CONNECTION_STRING_ENV) {
            info!("Using storage connection string from {}", CONNECTION_STRING_ENV);
            self.storage.connection_string = Some(connection_string);
        }
        if let Ok(port) = env::var(SERVER_PORT_ENV) {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Ignoring invalid {}={}: {}", SERVER_PORT_ENV, port, e),
            }
        }
    }
}
