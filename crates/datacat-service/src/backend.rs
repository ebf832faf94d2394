//! Document store selection from configuration.

use std::sync::Arc;

use object_store::local::LocalFileSystem;

use datacat_core::{CoreError, CoreResult, DocumentStore};
use datacat_storage::{MemoryDocumentStore, ObjectDocumentStore};

use crate::config::{StorageBackendKind, StorageConfig};

/// Opens the configured document store.
///
/// The local backend creates its root directory when missing.
pub fn open_document_store(config: &StorageConfig) -> CoreResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackendKind::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        StorageBackendKind::Local => {
            std::fs::create_dir_all(&config.path).map_err(|e| {
                CoreError::storage(format!(
                    "failed to create storage directory {}: {e}",
                    config.path.display()
                ))
            })?;
            let local = LocalFileSystem::new_with_prefix(&config.path).map_err(|e| {
                CoreError::storage(format!(
                    "failed to open storage directory {}: {e}",
                    config.path.display()
                ))
            })?;
            tracing::info!(path = %config.path.display(), "Using local object store");
            Ok(Arc::new(ObjectDocumentStore::new(Arc::new(local))))
        }
    }
}
