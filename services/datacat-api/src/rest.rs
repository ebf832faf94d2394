use axum::{
    extract::Request,
    middleware,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::{
    handlers::{
        add_consumer_key, catalog_info, delete_consumer_key, delete_document, get_consumer,
        get_document, metrics_handler, register_consumer, register_document,
        register_document_with_id, run_query, update_document,
    },
    middleware::track_metrics,
    state::AppState,
};

/// Version 1 of the catalog API.
fn v1_routes() -> Router<AppState> {
    Router::new()
        // Consumers
        .route("/consumers", post(register_consumer))
        .route("/consumers/:id", get(get_consumer))
        .route("/consumers/:id/keys", post(add_consumer_key))
        .route("/consumers/:id/keys/:key_id", delete(delete_consumer_key))
        // Catalog
        .route("/catalog", get(catalog_info))
        // Data
        .route("/:collection", get(run_query).post(register_document))
        .route(
            "/:collection/:doc_id",
            get(get_document)
                .post(register_document_with_id)
                .put(update_document)
                .delete(delete_document),
        )
}

/// Builds the Axum router hosting the datacat REST API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/v1", v1_routes())
        .with_state(state)
        // Add metrics middleware (tracks ALL requests)
        .layer(middleware::from_fn(track_metrics))
        // Add logging layer
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::debug!("started processing request");
                })
                .on_response(|response: &Response, latency: std::time::Duration, _span: &Span| {
                    let status = response.status();
                    let latency_ms = latency.as_millis();

                    if status.is_server_error() {
                        tracing::error!(status = %status, latency_ms = latency_ms, "request failed with server error");
                    } else if status.is_client_error() {
                        tracing::warn!(status = %status, latency_ms = latency_ms, "request failed with client error");
                    } else {
                        tracing::info!(status = %status, latency_ms = latency_ms, "request completed");
                    }
                })
                .on_failure(|failure_class: ServerErrorsFailureClass, latency: std::time::Duration, _span: &Span| {
                    tracing::error!(failure_class = ?failure_class, latency_ms = latency.as_millis(), "request failed");
                }),
        )
}

async fn health_check() -> &'static str {
    "ok"
}
