//! Collection query and document handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use datacat_core::Document;
use datacat_service::QueryResponse;

use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

/// Run a filtered query over a collection
pub async fn run_query(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<QueryResponse>, ApiError> {
    Ok(Json(state.data.run_query(&collection, &params).await?))
}

/// Register a document with a generated id
pub async fn register_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .data
        .register_document(&collection, None, body)
        .await?;
    Ok(Json(document))
}

/// Register a document under the id given in the path
pub async fn register_document_with_id(
    State(state): State<AppState>,
    Path((collection, doc_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .data
        .register_document(&collection, Some(&doc_id), body)
        .await?;
    Ok(Json(document))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((collection, doc_id)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.data.get_document(&collection, &doc_id).await?))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path((collection, doc_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .data
        .update_document(&collection, &doc_id, body)
        .await?;
    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path((collection, doc_id)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.data.delete_document(&collection, &doc_id).await?))
}
