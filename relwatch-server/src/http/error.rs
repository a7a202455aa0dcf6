//! API error types with IntoResponse
//!
//! Errors are converted to JSON `{error, message}` bodies with appropriate
//! status codes. Storage failures are logged and answered generically.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relwatch_core::{ProviderError, StorageError, TrackerError};
use serde_json::json;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Not a usable GitHub repository URL (400)
    InvalidUrl(String),

    /// Malformed request input (400)
    Validation(String),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// GitHub failed or refused (502)
    Upstream(ProviderError),

    /// Storage error (500, logged)
    Storage(StorageError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidUrl(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::InvalidUrl(message) => json!({
                "error": "invalid_url",
                "message": message
            }),
            Self::Validation(message) => json!({
                "error": "validation_error",
                "message": message
            }),
            Self::NotFound { resource, id } => json!({
                "error": "not_found",
                "message": format!("{} '{}' not found", resource, id)
            }),
            Self::Upstream(e) => {
                tracing::warn!("GitHub error: {}", e);
                json!({
                    "error": "upstream_error",
                    "message": e.to_string()
                })
            }
            Self::Storage(e) => {
                // Log the actual error, return generic message
                tracing::error!("Storage error: {}", e);
                json!({
                    "error": "internal_error",
                    "message": "an internal error occurred"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        match e {
            err @ TrackerError::InvalidUrl { .. } => Self::InvalidUrl(err.to_string()),
            err @ TrackerError::Validation { .. } => Self::Validation(err.to_string()),
            TrackerError::NotFound { resource, id } => Self::NotFound { resource, id },
            TrackerError::Provider(err) => Self::Upstream(err),
            TrackerError::Storage(err) => Self::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_url_is_400_with_message() {
        let err: ApiError = TrackerError::invalid_url("not-a-url", "not an absolute URL").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_url");
        assert!(body["message"].as_str().unwrap().contains("not-a-url"));
    }

    #[tokio::test]
    async fn validation_is_400() {
        let err: ApiError = TrackerError::validation("repository id", "'x' is not an integer id").into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err: ApiError = TrackerError::not_found("repository", 42).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["message"],
            "repository '42' not found"
        );
    }

    #[tokio::test]
    async fn provider_error_is_502() {
        let err: ApiError = TrackerError::Provider(ProviderError::Api {
            status: 500,
            message: "boom".into(),
        })
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn storage_error_is_500_without_details() {
        let err: ApiError = TrackerError::Storage(StorageError::constraint("secret detail")).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "internal_error");
        assert!(!body.to_string().contains("secret detail"));
    }
}
