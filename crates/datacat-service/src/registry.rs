//! Consumer registration and access key lifecycle.
//!
//! Registration runs as a sequence of forward steps. Every key pair persisted
//! by an earlier step is deleted again when a later step fails.
//!
//! Access key changes rewrite the whole consumer record, so they hold that
//! consumer's lock from the read through the write.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};

use datacat_core::metrics::{ACCESS_KEY_REJECTIONS, CONSUMER_REGISTRATIONS};
use datacat_core::{
    Consumer, ConsumerId, ConsumerRepository, ConsumerView, CoreError, CoreResult, KeyError,
    KeyPair, KeyPairId, KeyPairRepository, KeyPairView, KeyService,
};

/// Owns consumer records and the key pairs bound to them.
#[derive(Clone)]
pub struct ConsumerRegistry {
    consumers: Arc<dyn ConsumerRepository>,
    keys: Arc<dyn KeyPairRepository>,
    key_service: KeyService,
    consumer_locks: Arc<Mutex<HashMap<ConsumerId, Arc<Mutex<()>>>>>,
}

impl ConsumerRegistry {
    pub fn new(
        consumers: Arc<dyn ConsumerRepository>,
        keys: Arc<dyn KeyPairRepository>,
        key_service: KeyService,
    ) -> Self {
        Self {
            consumers,
            keys,
            key_service,
            consumer_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a new consumer.
    ///
    /// A fresh api key is generated and stored first. An optional access key
    /// is imported next; if it is not a usable public key the failure is
    /// logged and registration continues without it. The consumer record is
    /// stored last.
    pub async fn register(
        &self,
        details: Map<String, Value>,
        access_key: Option<&str>,
    ) -> CoreResult<ConsumerView> {
        tracing::info!("Registering a new API consumer");

        let result = self.run_registration(details, access_key).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        CONSUMER_REGISTRATIONS.with_label_values(&[outcome]).inc();

        if let Err(e) = &result {
            tracing::error!(error = %e, code = e.code(), "Consumer registration error");
        }
        result
    }

    async fn run_registration(
        &self,
        details: Map<String, Value>,
        access_key: Option<&str>,
    ) -> CoreResult<ConsumerView> {
        // Step 1: primary api key
        let api_key = self.generate_api_key().await?;
        self.keys
            .create(&api_key)
            .await
            .map_err(|e| CoreError::ApiKeyCreation(e.to_string()))?;
        tracing::debug!(key_id = %api_key.id, fingerprint = %api_key.fingerprint, "API key created");

        let mut persisted = vec![api_key.id];

        // Step 2: optional default access key
        let access_key = match access_key.filter(|text| !text.is_empty()) {
            Some(text) => match self.import_access_key(text) {
                Some(key) => {
                    if let Err(e) = self.keys.create(&key).await {
                        self.compensate(&persisted).await;
                        return Err(CoreError::StoringAccessKey(e.to_string()));
                    }
                    tracing::debug!(key_id = %key.id, "Adding default access key");
                    persisted.push(key.id);
                    Some(key)
                }
                None => None,
            },
            None => None,
        };

        // Step 3: consumer record
        let mut consumer = Consumer::new(api_key.id, details);
        if let Some(key) = &access_key {
            consumer.add_access_key(key.id);
        }
        if let Err(e) = self.consumers.create(&consumer).await {
            self.compensate(&persisted).await;
            return Err(CoreError::RegisteringConsumer(e.to_string()));
        }

        tracing::info!(consumer_id = %consumer.id, uuid = %consumer.uuid, "New consumer registered");
        let access_views = access_key.iter().map(KeyPair::public_view).collect();
        Ok(ConsumerView::new(&consumer, api_key.public_view(), access_views))
    }

    /// Looks up a consumer. Access keys are disclosed by fingerprint only.
    pub async fn get_info(&self, consumer_id: &str) -> CoreResult<ConsumerView> {
        tracing::info!(consumer_id, "Getting consumer details");
        let consumer = self.find_consumer(consumer_id).await?;

        let api_key = self.api_key_view(&consumer).await?;
        let access_keys = self
            .load_access_keys(&consumer)
            .await?
            .iter()
            .map(KeyPair::fingerprint_view)
            .collect();
        Ok(ConsumerView::new(&consumer, api_key, access_keys))
    }

    /// Adds an access key to a consumer and returns the stored key.
    ///
    /// Any import failure is reported as `InvalidPublicKey`.
    pub async fn add_access_key(
        &self,
        consumer_id: &str,
        access_key: Option<&str>,
    ) -> CoreResult<KeyPairView> {
        tracing::info!(consumer_id, "Add consumer key");
        let text = access_key
            .filter(|text| !text.is_empty())
            .ok_or(CoreError::MissingParameters("accessKey"))?;

        let id = parse_consumer_id(consumer_id)?;
        let _guard = self.lock_consumer(id).await;
        let mut consumer = self.load_consumer(id, consumer_id).await?;

        let key = self.key_service.import_public_text(text).map_err(|e| {
            ACCESS_KEY_REJECTIONS.with_label_values(&["add"]).inc();
            tracing::warn!(consumer_id = %consumer.id, error = %e, "Rejected access key");
            CoreError::InvalidPublicKey(e)
        })?;

        self.keys
            .create(&key)
            .await
            .map_err(|e| CoreError::StoringAccessKey(e.to_string()))?;

        consumer.add_access_key(key.id);
        if let Err(e) = self.consumers.update(&consumer).await {
            self.compensate(&[key.id]).await;
            return Err(CoreError::UpdatingConsumerRecord(e.to_string()));
        }

        tracing::debug!(consumer_id = %consumer.id, key_id = %key.id, "Added access key");
        Ok(key.public_view())
    }

    /// Removes one of the consumer's access keys and returns the updated consumer.
    pub async fn remove_access_key(
        &self,
        consumer_id: &str,
        key_id: &str,
    ) -> CoreResult<ConsumerView> {
        tracing::info!(consumer_id, key_id, "Delete consumer key");
        let id = parse_consumer_id(consumer_id)?;
        let _guard = self.lock_consumer(id).await;
        let mut consumer = self.load_consumer(id, consumer_id).await?;

        let key_id = key_id
            .parse::<KeyPairId>()
            .ok()
            .filter(|id| consumer.has_access_key(*id))
            .ok_or_else(|| CoreError::InvalidKeyId(key_id.to_string()))?;

        self.keys
            .delete(key_id)
            .await
            .map_err(|e| CoreError::RemovingKey(e.to_string()))?;

        consumer.remove_access_key(key_id);
        self.consumers
            .update(&consumer)
            .await
            .map_err(|e| CoreError::UpdatingConsumerRecord(e.to_string()))?;

        tracing::debug!(consumer_id = %consumer.id, key_id = %key_id, "Access key removal complete");
        let api_key = self.api_key_view(&consumer).await?;
        let access_keys = self
            .load_access_keys(&consumer)
            .await?
            .iter()
            .map(KeyPair::public_view)
            .collect();
        Ok(ConsumerView::new(&consumer, api_key, access_keys))
    }

    async fn generate_api_key(&self) -> CoreResult<KeyPair> {
        let key_service = self.key_service;
        tokio::task::spawn_blocking(move || key_service.generate())
            .await
            .map_err(|e| CoreError::ApiKeyCreation(e.to_string()))?
            .map_err(|e| CoreError::ApiKeyCreation(e.to_string()))
    }

    /// Imports an access key offered at registration. Failures are logged and
    /// counted, never returned.
    fn import_access_key(&self, text: &str) -> Option<KeyPair> {
        match self.key_service.import_public_text(text) {
            Ok(key) => Some(key),
            Err(e) => {
                ACCESS_KEY_REJECTIONS.with_label_values(&["register"]).inc();
                tracing::error!(
                    error = %e,
                    not_public = matches!(e, KeyError::NotAPublicKey),
                    "Invalid access key provided, continuing without it"
                );
                None
            }
        }
    }

    async fn find_consumer(&self, consumer_id: &str) -> CoreResult<Consumer> {
        self.load_consumer(parse_consumer_id(consumer_id)?, consumer_id)
            .await
    }

    async fn load_consumer(&self, id: ConsumerId, raw_id: &str) -> CoreResult<Consumer> {
        self.consumers
            .get(id)
            .await?
            .ok_or_else(|| CoreError::InvalidConsumerId(raw_id.to_string()))
    }

    /// Waits for exclusive access to one consumer's record.
    ///
    /// Idle entries are pruned here; an entry is idle when the map holds the
    /// only reference to its lock.
    async fn lock_consumer(&self, id: ConsumerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.consumer_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    async fn api_key_view(&self, consumer: &Consumer) -> CoreResult<KeyPairView> {
        self.keys
            .get(consumer.api_key)
            .await?
            .map(|key| key.public_view())
            .ok_or_else(|| {
                CoreError::internal(format!(
                    "api key `{}` of consumer `{}` is missing",
                    consumer.api_key, consumer.id
                ))
            })
    }

    async fn load_access_keys(&self, consumer: &Consumer) -> CoreResult<Vec<KeyPair>> {
        let mut keys = Vec::with_capacity(consumer.access_keys.len());
        for key_id in &consumer.access_keys {
            match self.keys.get(*key_id).await? {
                Some(key) => keys.push(key),
                None => tracing::warn!(
                    consumer_id = %consumer.id,
                    key_id = %key_id,
                    "Consumer references a missing access key"
                ),
            }
        }
        Ok(keys)
    }

    /// Deletes key pairs stored by earlier steps. Failures are logged only.
    async fn compensate(&self, key_ids: &[KeyPairId]) {
        for key_id in key_ids.iter().rev() {
            if let Err(e) = self.keys.delete(*key_id).await {
                tracing::error!(
                    key_id = %key_id,
                    error = %e,
                    "Failed to delete key pair while rolling back; record is orphaned"
                );
            }
        }
    }
}

fn parse_consumer_id(consumer_id: &str) -> CoreResult<ConsumerId> {
    consumer_id
        .parse::<ConsumerId>()
        .map_err(|_| CoreError::InvalidConsumerId(consumer_id.to_string()))
}
