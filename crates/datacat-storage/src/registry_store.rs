use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use datacat_core::{
    CollectionName, Consumer, ConsumerId, ConsumerRepository, CoreError, CoreResult, Document,
    DocumentStore, KeyPair, KeyPairId, KeyPairRepository,
};

/// Consumer and key pair records kept in the reserved `sys.consumers` and
/// `sys.keys` collections of a document store.
#[derive(Clone)]
pub struct DocumentRegistryStore {
    documents: Arc<dyn DocumentStore>,
    consumers: CollectionName,
    keys: CollectionName,
}

impl DocumentRegistryStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents,
            consumers: CollectionName::consumers(),
            keys: CollectionName::keys(),
        }
    }
}

fn to_document<T: Serialize>(record: &T) -> CoreResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(document) => Ok(document),
        other => Err(CoreError::Serialization(format!(
            "record serialized to non-object JSON: {other}"
        ))),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> CoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

#[async_trait]
impl ConsumerRepository for DocumentRegistryStore {
    async fn create(&self, consumer: &Consumer) -> CoreResult<()> {
        self.documents
            .insert(&self.consumers, to_document(consumer)?)
            .await?;
        debug!(consumer_id = %consumer.id, "Stored consumer record");
        Ok(())
    }

    async fn get(&self, consumer_id: ConsumerId) -> CoreResult<Option<Consumer>> {
        self.documents
            .find_by_id(&self.consumers, &consumer_id.to_string())
            .await?
            .map(from_document)
            .transpose()
    }

    async fn update(&self, consumer: &Consumer) -> CoreResult<()> {
        let updated = self
            .documents
            .update_by_id(&self.consumers, &consumer.id.to_string(), to_document(consumer)?)
            .await?;
        if updated.is_none() {
            return Err(CoreError::InvalidConsumerId(consumer.id.to_string()));
        }
        debug!(consumer_id = %consumer.id, "Updated consumer record");
        Ok(())
    }
}

#[async_trait]
impl KeyPairRepository for DocumentRegistryStore {
    async fn create(&self, key_pair: &KeyPair) -> CoreResult<()> {
        self.documents
            .insert(&self.keys, to_document(key_pair)?)
            .await?;
        debug!(key_id = %key_pair.id, fingerprint = %key_pair.fingerprint, "Stored key pair");
        Ok(())
    }

    async fn get(&self, key_id: KeyPairId) -> CoreResult<Option<KeyPair>> {
        self.documents
            .find_by_id(&self.keys, &key_id.to_string())
            .await?
            .map(from_document)
            .transpose()
    }

    async fn delete(&self, key_id: KeyPairId) -> CoreResult<bool> {
        let removed = self
            .documents
            .delete_by_id(&self.keys, &key_id.to_string())
            .await?;
        Ok(removed.is_some())
    }
}
