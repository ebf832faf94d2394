//! Core domain types and traits for the datacat services.

pub mod collection;
pub mod consumer;
pub mod document;
pub mod error;
pub mod filter;
pub mod ids;
pub mod keypair;
pub mod keys;
pub mod metrics;
pub mod traits;

pub use collection::{is_reserved, CollectionName};
pub use consumer::{Consumer, ConsumerView};
pub use document::{Document, Window};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use filter::{Filter, Predicate, Scalar};
pub use ids::{ConsumerId, KeyPairId};
pub use keypair::{KeyPair, KeyPairView};
pub use keys::{KeyError, KeyService};
pub use traits::{ConsumerRepository, DocumentStore, KeyPairRepository};
