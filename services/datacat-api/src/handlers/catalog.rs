//! Dataset catalog handler

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};

use datacat_query::pagination::{PAGE_PARAM, PAGE_SIZE_PARAM};
use datacat_query::PageRequest;
use datacat_service::CatalogResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// List catalog datasets as DCAT entries
pub async fn catalog_info(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let page = PageRequest::from_params(
        params.get(PAGE_PARAM).map(String::as_str),
        params.get(PAGE_SIZE_PARAM).map(String::as_str),
    );
    Ok(Json(state.data.catalog(page).await?))
}
