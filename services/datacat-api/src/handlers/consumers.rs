//! Consumer registration and access key handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use datacat_core::{ConsumerView, KeyPairView};

use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

/// Request to register a new consumer
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterConsumerRequest {
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
    /// Base64 encoded public key
    #[serde(default)]
    pub access_key: Option<String>,
}

/// Request to add an access key
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAccessKeyRequest {
    #[serde(default)]
    pub access_key: Option<String>,
}

/// Register a new consumer
pub async fn register_consumer(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterConsumerRequest>,
) -> Result<Json<ConsumerView>, ApiError> {
    let view = state
        .registry
        .register(req.details.unwrap_or_default(), req.access_key.as_deref())
        .await?;
    Ok(Json(view))
}

/// Get consumer details
pub async fn get_consumer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConsumerView>, ApiError> {
    Ok(Json(state.registry.get_info(&id).await?))
}

/// Add an access key to a consumer
pub async fn add_consumer_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AddAccessKeyRequest>,
) -> Result<Json<KeyPairView>, ApiError> {
    let key = state
        .registry
        .add_access_key(&id, req.access_key.as_deref())
        .await?;
    Ok(Json(key))
}

/// Remove an access key from a consumer
pub async fn delete_consumer_key(
    State(state): State<AppState>,
    Path((id, key_id)): Path<(String, String)>,
) -> Result<Json<ConsumerView>, ApiError> {
    Ok(Json(state.registry.remove_access_key(&id, &key_id).await?))
}
