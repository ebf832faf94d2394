//! Consumer domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::ids::{ConsumerId, KeyPairId};
use crate::keypair::KeyPairView;

/// A registered API consumer.
///
/// `api_key` is fixed at registration. `access_keys` is an ordered set of
/// references to public-only key pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    #[serde(rename = "_id")]
    pub id: ConsumerId,
    pub uuid: String,
    pub api_key: KeyPairId,
    #[serde(default)]
    pub access_keys: Vec<KeyPairId>,
    #[serde(default)]
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consumer {
    /// Creates a consumer bound to `api_key`.
    #[must_use]
    pub fn new(api_key: KeyPairId, details: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: ConsumerId::new(),
            uuid: Uuid::new_v4().hyphenated().to_string().to_uppercase(),
            api_key,
            access_keys: Vec::new(),
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when `key_id` is one of this consumer's access keys.
    #[must_use]
    pub fn has_access_key(&self, key_id: KeyPairId) -> bool {
        self.access_keys.contains(&key_id)
    }

    /// Appends an access key reference. Returns false if already present.
    pub fn add_access_key(&mut self, key_id: KeyPairId) -> bool {
        if self.has_access_key(key_id) {
            return false;
        }
        self.access_keys.push(key_id);
        self.touch();
        true
    }

    /// Removes an access key reference. Returns false if it was not present.
    pub fn remove_access_key(&mut self, key_id: KeyPairId) -> bool {
        let before = self.access_keys.len();
        self.access_keys.retain(|id| *id != key_id);
        let removed = self.access_keys.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Updates the `updated_at` timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Response projection of a [`Consumer`] with resolved key views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerView {
    pub id: ConsumerId,
    pub uuid: String,
    pub api_key: KeyPairView,
    pub access_keys: Vec<KeyPairView>,
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl ConsumerView {
    /// Builds a view from a consumer and its already projected keys.
    #[must_use]
    pub fn new(consumer: &Consumer, api_key: KeyPairView, access_keys: Vec<KeyPairView>) -> Self {
        Self {
            id: consumer.id,
            uuid: consumer.uuid.clone(),
            api_key,
            access_keys,
            details: consumer.details.clone(),
            created_at: consumer.created_at,
        }
    }
}
