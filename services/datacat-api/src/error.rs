//! Terminal error responder for every handler.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use datacat_core::{CoreError, ErrorKind};

/// Error body: the wire code and the HTTP status it was sent with.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status: u16,
}

/// API error wrapping the one error a handler failed with.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Policy => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code();

        if status.is_server_error() {
            error!(code, error = %self.0, "Internal error");
        } else {
            debug!(code, error = %self.0, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                message: code.to_string(),
                status: status.as_u16(),
            }),
        )
            .into_response()
    }
}

/// JSON body extractor. An empty body reads as `{}`; anything that does not
/// parse fails with `INVALID_REQUEST_BODY`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| CoreError::InvalidRequestBody(e.body_text()))?;

        let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(payload)
            .map(JsonBody)
            .map_err(|e| ApiError(CoreError::InvalidRequestBody(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};

    async fn body_of(err: CoreError) -> (StatusCode, ErrorResponse) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_answer_400() {
        for err in [
            CoreError::MissingParameters("accessKey"),
            CoreError::InvalidConsumerId("x".into()),
            CoreError::RestrictedCollection("sys.keys".into()),
        ] {
            let code = err.code();
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.message, code);
            assert_eq!(body.status, 400);
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let (status, body) = body_of(CoreError::storage("disk on fire at /var/lib")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "STORAGE_ERROR");
        assert_eq!(body.status, 500);
    }

    #[tokio::test]
    async fn test_json_body_treats_empty_as_object() {
        let req = Request::builder().body(Body::from("  ")).unwrap();
        let JsonBody(value) = JsonBody::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({}));

        let req = Request::builder().body(Body::from("{nope")).unwrap();
        let err = JsonBody::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(err.0.code(), "INVALID_REQUEST_BODY");
    }
}
