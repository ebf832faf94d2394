//! Stored key pair record and its public views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::KeyPairId;

/// Key material bound to a consumer, either its api key or an access key.
///
/// `public` and `private` hold base64-wrapped PEM text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    #[serde(rename = "_id")]
    pub id: KeyPairId,
    pub fingerprint: String,
    pub public: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl KeyPair {
    /// Creates a new record with a fresh identifier.
    #[must_use]
    pub fn new(fingerprint: String, public: String, private: Option<String>) -> Self {
        Self {
            id: KeyPairId::new(),
            fingerprint,
            public,
            private,
            created_at: Utc::now(),
        }
    }

    /// Returns true when no private material is attached.
    #[must_use]
    pub const fn is_public_only(&self) -> bool {
        self.private.is_none()
    }

    /// View exposing id, fingerprint and public material.
    #[must_use]
    pub fn public_view(&self) -> KeyPairView {
        KeyPairView {
            id: Some(self.id),
            fingerprint: self.fingerprint.clone(),
            public: Some(self.public.clone()),
        }
    }

    /// View exposing the fingerprint alone.
    #[must_use]
    pub fn fingerprint_view(&self) -> KeyPairView {
        KeyPairView {
            id: None,
            fingerprint: self.fingerprint.clone(),
            public: None,
        }
    }
}

/// Response projection of a [`KeyPair`]. Never carries private material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<KeyPairId>,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
}
