//! Configuration management for the datacat server.
//!
//! Supports multiple configuration sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. TOML configuration file
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use datacat_core::collection::is_reserved;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DATACAT_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Main configuration structure for the datacat server.
///
/// Can be loaded from TOML file or constructed with defaults.
/// Environment variables override TOML settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key generation parameters
    #[serde(default)]
    pub keys: KeysConfig,

    /// Dataset catalog rendering
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration (host, port)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// REST API port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Backend holding documents, consumers and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Process memory, lost on restart.
    Memory,
    /// JSON files under `storage.path`.
    Local,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::ValidationError(format!(
                "storage.backend must be one of: memory, local (got {other})"
            ))),
        }
    }
}

/// Document storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend (default: memory)
    #[serde(default = "default_backend")]
    pub backend: StorageBackendKind,

    /// Root directory of the local backend (default: "./data")
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Key generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// RSA modulus size of generated api keys (default: 1024)
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,
}

/// Dataset catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog title (default: "Data Catalog")
    #[serde(default = "default_catalog_title")]
    pub title: String,

    /// Catalog description (default: empty)
    #[serde(default)]
    pub description: String,

    /// Reserved collection holding dataset metadata (default: "sys.datasets")
    #[serde(default = "default_catalog_collection")]
    pub collection: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty (default: "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_backend() -> StorageBackendKind {
    StorageBackendKind::Memory
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_rsa_bits() -> usize {
    datacat_core::KeyService::DEFAULT_BITS
}

fn default_catalog_title() -> String {
    "Data Catalog".to_string()
}

fn default_catalog_collection() -> String {
    "sys.datasets".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            rsa_bits: default_rsa_bits(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            title: default_catalog_title(),
            description: String::new(),
            collection: default_catalog_collection(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Reads the file named by `DATACAT_CONFIG` if set, else `config.toml`
    /// if it exists, else uses defaults. Environment variables then override
    /// file/default values.
    ///
    /// Supported environment variables:
    /// - `DATACAT_HOST`, `DATACAT_PORT`
    /// - `DATACAT_STORAGE_BACKEND`, `DATACAT_STORAGE_PATH`
    /// - `DATACAT_RSA_BITS`
    /// - `DATACAT_CATALOG_TITLE`, `DATACAT_CATALOG_DESCRIPTION`
    /// - `DATACAT_LOG_LEVEL`, `DATACAT_LOG_FORMAT`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Unparsable numeric or backend values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DATACAT_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("DATACAT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(backend) = std::env::var("DATACAT_STORAGE_BACKEND") {
            if let Ok(backend) = backend.parse() {
                self.storage.backend = backend;
            }
        }

        if let Ok(path) = std::env::var("DATACAT_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(bits) = std::env::var("DATACAT_RSA_BITS") {
            if let Ok(bits) = bits.parse() {
                self.keys.rsa_bits = bits;
            }
        }

        if let Ok(title) = std::env::var("DATACAT_CATALOG_TITLE") {
            self.catalog.title = title;
        }

        if let Ok(description) = std::env::var("DATACAT_CATALOG_DESCRIPTION") {
            self.catalog.description = description;
        }

        if let Ok(level) = std::env::var("DATACAT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("DATACAT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.storage.backend == StorageBackendKind::Local
            && self.storage.path.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "storage.path cannot be empty for the local backend".to_string(),
            ));
        }

        if !(512..=8192).contains(&self.keys.rsa_bits) {
            return Err(ConfigError::ValidationError(format!(
                "keys.rsa_bits must be between 512 and 8192 (got {})",
                self.keys.rsa_bits
            )));
        }

        if !is_reserved(&self.catalog.collection) {
            return Err(ConfigError::ValidationError(format!(
                "catalog.collection must be a reserved sys./system. collection (got {})",
                self.catalog.collection
            )));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        // Validate log format
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of: {}",
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Failed to parse TOML in {path:?}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
