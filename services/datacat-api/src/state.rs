//! API state management
//!
//! The registry and the data service share one document store: consumer and
//! key records live in its reserved collections.

use std::sync::Arc;

use datacat_core::{CoreResult, DocumentStore, KeyService};
use datacat_service::{open_document_store, Config, ConsumerRegistry, DataService};
use datacat_storage::DocumentRegistryStore;

/// Shared application state for the API server
#[derive(Clone)]
pub struct AppState {
    /// Consumer registration and access keys
    pub registry: ConsumerRegistry,
    /// Collection queries, documents and the catalog
    pub data: DataService,
}

impl AppState {
    /// Wires the services onto an already opened store.
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> CoreResult<Self> {
        let records = Arc::new(DocumentRegistryStore::new(store.clone()));
        let registry = ConsumerRegistry::new(
            records.clone(),
            records,
            KeyService::new(config.keys.rsa_bits),
        );
        let data = DataService::new(store, config.catalog.clone())?;

        Ok(Self { registry, data })
    }

    /// Opens the configured store and wires the services onto it.
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        let store = open_document_store(&config.storage)?;
        Self::new(store, config)
    }
}
