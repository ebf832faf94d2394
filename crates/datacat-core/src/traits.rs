use async_trait::async_trait;

use crate::collection::CollectionName;
use crate::consumer::Consumer;
use crate::document::{Document, Window};
use crate::error::CoreResult;
use crate::filter::Filter;
use crate::ids::{ConsumerId, KeyPairId};
use crate::keypair::KeyPair;

/// Generic schema-free repository addressed by collection name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the documents matching `filter` within `window`, in storage order.
    async fn find(
        &self,
        collection: &CollectionName,
        filter: &Filter,
        window: Window,
    ) -> CoreResult<Vec<Document>>;

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &CollectionName, filter: &Filter) -> CoreResult<u64>;

    /// Fetches a document by its `_id`.
    async fn find_by_id(&self, collection: &CollectionName, id: &str)
        -> CoreResult<Option<Document>>;

    /// Stores a new document, assigning an `_id` if it has none.
    ///
    /// Returns the stored document.
    async fn insert(&self, collection: &CollectionName, document: Document) -> CoreResult<Document>;

    /// Inserts several documents sequentially.
    async fn insert_batch(
        &self,
        collection: &CollectionName,
        documents: Vec<Document>,
    ) -> CoreResult<Vec<Document>> {
        let mut stored = Vec::with_capacity(documents.len());
        for document in documents {
            stored.push(self.insert(collection, document).await?);
        }
        Ok(stored)
    }

    /// Merges `changes` into the document's top-level fields. `_id` is kept.
    ///
    /// Returns the updated document, or `None` when it does not exist.
    async fn update_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
        changes: Document,
    ) -> CoreResult<Option<Document>>;

    /// Removes a document, returning it when it existed.
    async fn delete_by_id(&self, collection: &CollectionName, id: &str)
        -> CoreResult<Option<Document>>;
}

/// Repository interface for consumer records.
#[async_trait]
pub trait ConsumerRepository: Send + Sync {
    /// Persists a newly registered consumer.
    async fn create(&self, consumer: &Consumer) -> CoreResult<()>;

    /// Retrieves a consumer by its identifier.
    async fn get(&self, consumer_id: ConsumerId) -> CoreResult<Option<Consumer>>;

    /// Replaces an existing consumer record.
    async fn update(&self, consumer: &Consumer) -> CoreResult<()>;
}

/// Repository interface for stored key pairs.
#[async_trait]
pub trait KeyPairRepository: Send + Sync {
    /// Persists a key pair.
    async fn create(&self, key_pair: &KeyPair) -> CoreResult<()>;

    /// Retrieves a key pair by its identifier.
    async fn get(&self, key_id: KeyPairId) -> CoreResult<Option<KeyPair>>;

    /// Deletes a key pair. Returns false if it did not exist.
    async fn delete(&self, key_id: KeyPairId) -> CoreResult<bool>;
}
