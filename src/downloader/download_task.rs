//! Download worker: one background task per task record.
//!
//! The worker owns the only write path to its record. Whatever happens inside
//! the engine, the record ends in a terminal state: extraction failures become
//! a categorized `detail`, panics are caught, and a drop guard fails the record
//! if the worker future is dropped before it finishes (runtime shutdown).

use crate::engine::MediaEngine;
use crate::error::Error;
use crate::progress::ProgressTranslator;
use crate::task_store::{TaskStore, TaskUpdate};
use crate::types::{FetchRequest, RawProgress, TaskId};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::gateway::remove_task_files;

/// Detail recorded when the worker fails for reasons other than the engine
pub(crate) const INTERNAL_FAILURE_DETAIL: &str =
    "internal error: download task failed unexpectedly";

/// Everything a worker needs, detached from the downloader
pub(crate) struct DownloadTaskContext {
    pub(crate) id: TaskId,
    pub(crate) url: String,
    pub(crate) format_expr: String,
    pub(crate) work_dir: PathBuf,
    pub(crate) store: Arc<TaskStore>,
    pub(crate) engine: Arc<dyn MediaEngine>,
}

/// Fails the record if it is still running when the worker goes away
struct TerminalGuard {
    id: TaskId,
    store: Arc<TaskStore>,
    work_dir: PathBuf,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let still_running = self
            .store
            .get(self.id)
            .map(|r| !r.status.is_terminal())
            .unwrap_or(false);
        if !still_running {
            return;
        }

        tracing::error!(task_id = %self.id, "Download worker stopped before reaching a terminal state");
        fail(&self.store, self.id, INTERNAL_FAILURE_DETAIL);
        if let Err(e) = std::fs::remove_dir_all(&self.work_dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(task_id = %self.id, error = %e, "Failed to remove task directory");
        }
    }
}

fn fail(store: &TaskStore, id: TaskId, detail: &str) {
    if let Err(e) = store.update(
        id,
        TaskUpdate::Failed {
            detail: detail.to_string(),
        },
    ) {
        tracing::debug!(task_id = %id, error = %e, "Could not record task failure");
    }
}

/// Run one task to completion
///
/// Phases:
/// 1. Create the per-task output directory
/// 2. Fetch through the engine, translating each progress callback
/// 3. Record the finished file, or the failure and remove the directory
pub(crate) async fn run_download_task(ctx: DownloadTaskContext) {
    let _guard = TerminalGuard {
        id: ctx.id,
        store: ctx.store.clone(),
        work_dir: ctx.work_dir.clone(),
    };
    let started = Instant::now();

    let outcome = AssertUnwindSafe(execute(&ctx)).catch_unwind().await;

    let detail = match outcome {
        Ok(Ok(path)) => match finish(&ctx, path) {
            Ok(()) => {
                tracing::info!(
                    task_id = %ctx.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Download finished"
                );
                return;
            }
            Err(e) => {
                tracing::error!(task_id = %ctx.id, error = %e, "Failed to record finished download");
                INTERNAL_FAILURE_DETAIL.to_string()
            }
        },
        Ok(Err(Error::Extraction(e))) => {
            tracing::warn!(
                task_id = %ctx.id,
                kind = e.kind.code(),
                error = %e.message,
                "Download failed"
            );
            e.detail()
        }
        Ok(Err(e)) => {
            tracing::error!(task_id = %ctx.id, error = %e, "Download task failed");
            INTERNAL_FAILURE_DETAIL.to_string()
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(task_id = %ctx.id, panic = %message, "Download task panicked");
            INTERNAL_FAILURE_DETAIL.to_string()
        }
    };

    fail(&ctx.store, ctx.id, &detail);
    remove_task_files(Some(&ctx.work_dir), None).await;
}

async fn execute(ctx: &DownloadTaskContext) -> crate::Result<PathBuf> {
    tokio::fs::create_dir_all(&ctx.work_dir).await?;

    let started = Instant::now();
    let translator = Mutex::new(ProgressTranslator::new());
    let store = ctx.store.clone();
    let id = ctx.id;

    // Translation and store update happen under one lock so the record always
    // holds the values of the last callback
    let on_progress = move |raw: RawProgress| {
        let mut translator = translator.lock().unwrap_or_else(PoisonError::into_inner);
        let sample = translator.translate(raw, started.elapsed());
        if let Err(e) = store.update(id, TaskUpdate::Progress(sample)) {
            tracing::debug!(task_id = %id, error = %e, "Dropped progress update");
        }
    };

    let request = FetchRequest {
        url: ctx.url.clone(),
        format_expr: ctx.format_expr.clone(),
        output_dir: ctx.work_dir.clone(),
    };

    tracing::debug!(task_id = %ctx.id, dir = %ctx.work_dir.display(), "Starting fetch");
    let path = ctx.engine.fetch(&request, &on_progress).await?;

    let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
        crate::error::ExtractionError::new(
            crate::error::ExtractionErrorKind::Other,
            format!("engine reported output file '{}' that cannot be read: {}", path.display(), e),
        )
    })?;
    if !metadata.is_file() {
        return Err(crate::error::ExtractionError::new(
            crate::error::ExtractionErrorKind::Other,
            format!("engine output '{}' is not a file", path.display()),
        )
        .into());
    }

    Ok(path)
}

fn finish(ctx: &DownloadTaskContext, path: PathBuf) -> crate::Result<()> {
    let filename = file_name(&path)
        .ok_or_else(|| Error::Other(format!("output path '{}' has no file name", path.display())))?;
    ctx.store.update(
        ctx.id,
        TaskUpdate::Finished {
            filename,
            file_path: path,
        },
    )
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}
