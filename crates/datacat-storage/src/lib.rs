//! Document store backends for datacat.
//!
//! Two [`DocumentStore`](datacat_core::DocumentStore) implementations share
//! one matcher: [`MemoryDocumentStore`] for tests and ephemeral deployments,
//! and [`ObjectDocumentStore`] over any `object_store` backend.
//! [`DocumentRegistryStore`] layers the consumer and key pair repositories on
//! top of either.

mod error;
pub mod matcher;
pub mod memory;
pub mod object;
pub mod registry_store;

pub use matcher::DocumentMatcher;
pub use memory::MemoryDocumentStore;
pub use object::ObjectDocumentStore;
pub use registry_store::DocumentRegistryStore;
