//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Internal errors reach the caller as a generic message only
        if self.is_internal() {
            tracing::error!(error = %self, "Request failed with internal error");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Default to 500 if we're directly converting an ApiError
        // (usually errors go through Error::into_response which has the status code)
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Malformed JSON bodies are validation errors
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, ExtractionErrorKind, TaskError};
    use crate::types::TaskId;

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_into_response() {
        let id = TaskId::new();
        let response = Error::from(TaskError::NotFound { id }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "task_not_found");
        assert_eq!(
            api_error.error.details.unwrap()["task_id"],
            id.to_string()
        );
    }

    #[tokio::test]
    async fn test_not_ready_into_response() {
        let id = TaskId::new();
        let response = Error::from(TaskError::NotReady {
            id,
            status: "downloading".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "task_not_ready");
        assert_eq!(api_error.error.details.unwrap()["status"], "downloading");
    }

    #[tokio::test]
    async fn test_file_gone_into_response() {
        let response = Error::from(TaskError::FileGone { id: TaskId::new() }).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(body_of(response).await.error.code, "file_gone");
    }

    #[tokio::test]
    async fn test_extraction_error_passes_engine_message() {
        let response = Error::from(ExtractionError::new(
            ExtractionErrorKind::ContentUnavailable,
            "Video unavailable. This video is private",
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "content_unavailable");
        assert!(api_error.error.message.contains("This video is private"));
        assert_eq!(
            api_error.error.details.unwrap()["kind"],
            "content_unavailable"
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let error = Error::Io(std::io::Error::other("disk exploded at /srv/secret"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "internal_error");
        assert!(!api_error.error.message.contains("secret"));
    }

    #[tokio::test]
    async fn test_shutting_down_into_response() {
        let response = Error::ShuttingDown.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(response).await.error.code, "shutting_down");
    }
}
