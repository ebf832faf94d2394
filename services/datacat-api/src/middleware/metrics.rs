//! Metrics middleware for tracking API requests
//!
//! Records request count, duration and in-flight requests for every route.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};

use datacat_core::metrics::{ACTIVE_CONNECTIONS, API_REQUEST_COUNT, API_REQUEST_DURATION};

/// Middleware to track API request metrics
///
/// Requests are labelled by route template, so `/v1/widgets` and
/// `/v1/gadgets` share the `/v1/:collection` series.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().clone();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unknown".to_string());

    ACTIVE_CONNECTIONS.inc();
    let response = next.run(req).await;
    ACTIVE_CONNECTIONS.dec();

    let status = response.status().as_u16().to_string();
    API_REQUEST_COUNT
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();
    API_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path])
        .observe(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_metrics_middleware() {
        let app = Router::new()
            .route("/items/:id", get(test_handler))
            .route_layer(middleware::from_fn(track_metrics));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let recorded = API_REQUEST_COUNT
            .with_label_values(&["GET", "/items/:id", "200"])
            .get();
        assert!(recorded >= 1);
    }
}
