//! Task handlers: probe, start, poll and file retrieval.

use super::parse_task_id;
use crate::MediaDownloader;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadRequest, DownloadStarted, ProbeRequest, TaskId};
use crate::utils::{content_disposition, guess_media_type};
use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// POST /probe - Inspect a URL and list its formats
#[utoipa::path(
    post,
    path = "/probe",
    tag = "tasks",
    request_body = ProbeRequest,
    responses(
        (status = 200, description = "Media metadata and available formats", body = crate::types::ProbeResult),
        (status = 400, description = "Invalid URL or the extractor rejected it", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn probe(
    State(state): State<AppState>,
    payload: Result<Json<ProbeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Error::from(rejection).into_response(),
    };

    match state.downloader.probe(&request.url).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /download - Start a background download
#[utoipa::path(
    post,
    path = "/download",
    tag = "tasks",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Task created", body = DownloadStarted),
        (status = 400, description = "Invalid URL, unknown format id, or probe failure", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Error::from(rejection).into_response(),
    };

    match state.downloader.start_download(request).await {
        Ok(task_id) => (StatusCode::OK, Json(DownloadStarted { task_id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /progress/:task_id - Current task snapshot
#[utoipa::path(
    get,
    path = "/progress/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID returned by POST /download")),
    responses(
        (status = 200, description = "Task status and progress", body = crate::types::TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_progress(State(state): State<AppState>, Path(task_id): Path<String>) -> Response {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.downloader.get_progress(id) {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks - Every known task, oldest first
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks", body = Vec<crate::types::TaskInfo>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.list_tasks()))
}

/// GET /download/:task_id - Stream the finished file
#[utoipa::path(
    get,
    path = "/download/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID returned by POST /download")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task has not finished", body = crate::error::ApiError),
        (status = 410, description = "File is no longer on disk", body = crate::error::ApiError)
    )
)]
pub async fn fetch_file(State(state): State<AppState>, Path(task_id): Path<String>) -> Response {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let downloaded = match state.downloader.open_file(id).await {
        Ok(file) => file,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(
        task_id = %id,
        filename = %downloaded.filename,
        size = downloaded.size,
        "Serving downloaded file"
    );

    let disposition = HeaderValue::from_str(&content_disposition(&downloaded.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let media_type = guess_media_type(&downloaded.path);

    let stream = ReaderStream::new(downloaded.file);
    let body = if state.config.retention.cleanup_after_fetch {
        let guard = CleanupOnDrop {
            downloader: state.downloader.clone(),
            id,
        };
        Body::from_stream(stream.map(move |chunk| {
            let _guard = &guard;
            chunk
        }))
    } else {
        Body::from_stream(stream)
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(media_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(downloaded.size)),
        ],
        body,
    )
        .into_response()
}

/// Removes the task once the response body is dropped (sent or aborted)
struct CleanupOnDrop {
    downloader: Arc<MediaDownloader>,
    id: TaskId,
}

impl Drop for CleanupOnDrop {
    fn drop(&mut self) {
        let downloader = self.downloader.clone();
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    downloader.cleanup_task(id).await;
                });
            }
            Err(_) => tracing::warn!(task_id = %id, "No runtime to clean up fetched task"),
        }
    }
}
