//! Service layer for datacat.
//! Consumer registry, data access and configuration shared by the API.

mod backend;
mod config;
mod data;
mod registry;

pub use backend::open_document_store;
pub use config::{
    CatalogConfig, Config, ConfigError, KeysConfig, LoggingConfig, ServerConfig,
    StorageBackendKind, StorageConfig, CONFIG_PATH_ENV,
};
pub use data::{CatalogMetadata, CatalogResponse, DataService, QueryResponse};
pub use registry::ConsumerRegistry;
