//! Error types for media-dl
//!
//! This module provides the error taxonomy shared by the orchestrator and the
//! REST API:
//! - Domain errors (validation, extraction, task lookup, task state)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Internal failures carry their real cause for logging but are reported to API
//! callers with a generic message.

use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Malformed request or a format id that the probe did not report
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure reported by the extraction engine
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// Task-level errors (lookup and state transitions)
    #[error("{0}")]
    Task(#[from] TaskError),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other internal error
    #[error("{0}")]
    Other(String),
}

/// Errors about a single task record
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task id unknown to the store
    #[error("task {id} not found")]
    NotFound {
        /// The task id that was looked up
        id: TaskId,
    },

    /// The task has not finished yet, so there is no file to hand out
    #[error("task {id} is not ready (status: {status})")]
    NotReady {
        /// The task id
        id: TaskId,
        /// Current status of the task
        status: String,
    },

    /// The task finished but its file is no longer on disk
    #[error("file for task {id} is no longer available")]
    FileGone {
        /// The task id
        id: TaskId,
    },

    /// A state transition was rejected because it would break a record invariant
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidTransition {
        /// The task id
        id: TaskId,
        /// The transition that was attempted (e.g., "report progress on")
        operation: String,
        /// The state that rejected it
        current_state: String,
    },
}

/// Category of an extraction engine failure, derived from the engine's message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    /// The URL is malformed or no extractor supports the site
    UnsupportedUrl,
    /// The content exists but cannot be accessed (private, removed, geo-blocked, login required)
    ContentUnavailable,
    /// Network failure while talking to the provider
    Network,
    /// Fetch succeeded but merging/converting the result failed
    Postprocessing,
    /// The engine itself is missing or could not be started
    EngineUnavailable,
    /// Anything the categorizer does not recognize
    Other,
}

impl ExtractionErrorKind {
    /// Machine-readable error code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionErrorKind::UnsupportedUrl => "unsupported_url",
            ExtractionErrorKind::ContentUnavailable => "content_unavailable",
            ExtractionErrorKind::Network => "network_error",
            ExtractionErrorKind::Postprocessing => "postprocessing_failed",
            ExtractionErrorKind::EngineUnavailable => "engine_unavailable",
            ExtractionErrorKind::Other => "extraction_failed",
        }
    }

    /// Short human-readable label, used as the prefix of a task's `detail`
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionErrorKind::UnsupportedUrl => "unsupported URL",
            ExtractionErrorKind::ContentUnavailable => "content unavailable",
            ExtractionErrorKind::Network => "network error",
            ExtractionErrorKind::Postprocessing => "post-processing failed",
            ExtractionErrorKind::EngineUnavailable => "extraction engine unavailable",
            ExtractionErrorKind::Other => "extraction failed",
        }
    }
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure raised by the extraction engine during probe or fetch
///
/// The message is the engine's own text, passed through for debuggability.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ExtractionError {
    /// Category of the failure
    pub kind: ExtractionErrorKind,
    /// Engine-provided message
    pub message: String,
}

impl ExtractionError {
    /// Create an error with an explicit category
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create an error whose category is inferred from the engine message
    pub fn categorize(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = crate::engine::categorize_error(&message);
        Self { kind, message }
    }

    /// Text stored in a failed task's `detail` field
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task 6f1c... not found",
///     "details": {
///       "task_id": "6f1c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "task_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl Error {
    /// Whether this error is an internal failure whose detail must not reach callers
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Serialization(_) | Error::ApiServerError(_) | Error::Other(_)
        )
    }
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - invalid input or provider refusal
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Extraction(_) => 400,

            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Task(TaskError::NotReady { .. }) => 409,
            Error::Task(TaskError::InvalidTransition { .. }) => 409,
            Error::Task(TaskError::FileGone { .. }) => 410,

            Error::ShuttingDown => 503,

            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Extraction(e) => e.kind.code(),
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::NotReady { .. } => "task_not_ready",
                TaskError::FileGone { .. } => "file_gone",
                TaskError::InvalidTransition { .. } => "invalid_transition",
            },
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "internal_error",
            Error::Serialization(_) => "internal_error",
            Error::ApiServerError(_) => "internal_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        if error.is_internal() {
            return ApiError::new(code, "internal server error");
        }

        let message = error.to_string();
        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Extraction(e) => Some(serde_json::json!({
                "kind": e.kind,
            })),
            Error::Task(TaskError::NotFound { id }) | Error::Task(TaskError::FileGone { id }) => {
                Some(serde_json::json!({
                    "task_id": id,
                }))
            }
            Error::Task(TaskError::NotReady { id, status }) => Some(serde_json::json!({
                "task_id": id,
                "status": status,
            })),
            Error::Task(TaskError::InvalidTransition {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
