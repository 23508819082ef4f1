//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Probe, start a download, poll progress, fetch the file
//! - [`system`] - Health and OpenAPI

use crate::error::ApiError;
use crate::types::TaskId;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use tasks::*;

/// Parse a task id from a path segment
///
/// Malformed ids can never name a task, so they are reported as not found.
fn parse_task_id(raw: &str) -> std::result::Result<TaskId, Response> {
    raw.parse::<TaskId>().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::with_details(
                "task_not_found",
                format!("task {} not found", raw),
                serde_json::json!({ "task_id": raw }),
            )),
        )
            .into_response()
    })
}
