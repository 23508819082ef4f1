//! Boundary operations: probe, start a download, poll, retrieve the file.

use crate::error::{Error, Result, TaskError};
use crate::format_resolver;
use crate::task_store::NewTask;
use crate::types::{DownloadRequest, FormatInfo, ProbeResult, TaskId, TaskInfo, TaskStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::MediaDownloader;
use super::download_task::{DownloadTaskContext, run_download_task};

/// Maximum number of probed URLs whose formats are remembered
const PROBE_CACHE_CAPACITY: usize = 256;

/// Cached format lists older than this are probed again
const PROBE_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Format lists of recently probed URLs
#[derive(Debug, Default)]
pub(crate) struct ProbeCache {
    entries: Mutex<HashMap<String, (Instant, Arc<Vec<FormatInfo>>)>>,
}

impl ProbeCache {
    pub(crate) fn insert(&self, url: &str, formats: Vec<FormatInfo>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, (at, _)| now.duration_since(*at) < PROBE_CACHE_TTL);
        if entries.len() >= PROBE_CACHE_CAPACITY
            && let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, (at, _))| *at)
                .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest);
        }
        entries.insert(url.to_string(), (now, Arc::new(formats)));
    }

    pub(crate) fn get(&self, url: &str) -> Option<Arc<Vec<FormatInfo>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(url)
            .filter(|(at, _)| at.elapsed() < PROBE_CACHE_TTL)
            .map(|(_, formats)| formats.clone())
    }
}

/// A finished task's file, opened for reading
#[derive(Debug)]
pub struct DownloadedFile {
    /// Task the file belongs to
    pub task_id: TaskId,
    /// File name shown to the caller
    pub filename: String,
    /// Location on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Open handle, positioned at the start
    pub file: tokio::fs::File,
}

/// Accept only absolute http(s) URLs with a host
fn validate_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("url must not be empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("invalid url '{}': {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "unsupported url scheme '{}': only http and https are accepted",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::Validation(format!("url '{}' has no host", trimmed)));
    }
    Ok(trimmed.to_string())
}

impl MediaDownloader {
    /// Inspect a URL and list its formats
    ///
    /// The format list is remembered so a following
    /// [`start_download`](Self::start_download) for the same URL can resolve
    /// its format id without probing again.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed URL
    /// - [`Error::Extraction`] when the engine rejects the URL
    pub async fn probe(&self, url: &str) -> Result<ProbeResult> {
        let url = validate_url(url)?;
        tracing::debug!(url = %url, engine = self.engine.name(), "Probing URL");

        let result = self.engine.probe(&url).await.map_err(|e| {
            tracing::info!(url = %url, error = %e, "Probe failed");
            Error::Extraction(e)
        })?;

        self.probe_cache.insert(&url, result.formats.clone());
        tracing::info!(
            url = %url,
            formats = result.formats.len(),
            downloadable = result.is_downloadable,
            "Probe complete"
        );
        Ok(result)
    }

    /// Resolve the requested format, register a task and spawn its worker
    ///
    /// Returns as soon as the task exists; the fetch runs in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has started
    /// - [`Error::Validation`] for a malformed URL or an unknown format id
    /// - [`Error::Extraction`] when the formats have to be probed and the probe fails
    pub async fn start_download(&self, request: DownloadRequest) -> Result<TaskId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let url = validate_url(&request.url)?;
        let format_request = request.format_request();
        let formats = self.formats_for(&url, &format_request).await?;
        let format_expr = format_resolver::resolve_with_default(
            &format_request,
            &formats,
            &self.config.download.default_format,
        )?;

        // Shutdown may have started while probing
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = self.store.create(NewTask {
            url: url.clone(),
            format_expr: format_expr.clone(),
            work_root: Some(self.config.download.download_dir.clone()),
        });
        let work_dir = self.config.download.download_dir.join(id.to_string());

        let ctx = DownloadTaskContext {
            id,
            url,
            format_expr,
            work_dir,
            store: self.store.clone(),
            engine: self.engine.clone(),
        };

        tracing::info!(
            task_id = %id,
            url = %ctx.url,
            format_expr = %ctx.format_expr,
            "Download task created"
        );
        self.workers.spawn(run_download_task(ctx));

        Ok(id)
    }

    /// Formats to resolve `format_request` against
    ///
    /// No probe is needed when no format was requested or when the caller's
    /// hints already show no audio pairing is required.
    async fn formats_for(
        &self,
        url: &str,
        format_request: &crate::types::FormatRequest,
    ) -> Result<Arc<Vec<FormatInfo>>> {
        let has_format_id = format_request
            .format_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());

        if let Some(cached) = self.probe_cache.get(url) {
            return Ok(cached);
        }
        if !has_format_id || format_request.hints_are_conclusive() {
            return Ok(Arc::new(Vec::new()));
        }

        tracing::debug!(url = %url, "No cached probe, probing before download");
        let result = self.engine.probe(url).await?;
        let formats = Arc::new(result.formats);
        self.probe_cache.insert(url, formats.as_ref().clone());
        Ok(formats)
    }

    /// Current snapshot of a task
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id. Never creates a record.
    pub fn get_progress(&self, id: TaskId) -> Result<TaskInfo> {
        Ok(self.store.get(id)?.into())
    }

    /// Snapshot of every task, oldest first
    pub fn list_tasks(&self) -> Vec<TaskInfo> {
        self.store.list().into_iter().map(TaskInfo::from).collect()
    }

    /// Open the file of a finished task
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] for an unknown id
    /// - [`TaskError::NotReady`] unless the task has finished
    /// - [`TaskError::FileGone`] when the file was removed from disk; the
    ///   record is then discarded as well
    pub async fn open_file(&self, id: TaskId) -> Result<DownloadedFile> {
        let record = self.store.get(id)?;

        let (TaskStatus::Finished, Some(filename), Some(path)) =
            (record.status, record.filename, record.file_path)
        else {
            return Err(TaskError::NotReady {
                id,
                status: record.status.to_string(),
            }
            .into());
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(task_id = %id, path = %path.display(), "Finished file is missing");
                self.cleanup_task(id).await;
                return Err(TaskError::FileGone { id }.into());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let size = file.metadata().await?.len();

        Ok(DownloadedFile {
            task_id: id,
            filename,
            path,
            size,
            file,
        })
    }

    /// Remove a task record together with its directory and file
    ///
    /// Returns whether a record was removed. Unknown ids are ignored.
    pub async fn cleanup_task(&self, id: TaskId) -> bool {
        let Some(record) = self.store.remove(id) else {
            return false;
        };
        remove_task_files(record.work_dir.as_deref(), record.file_path.as_deref()).await;
        tracing::debug!(task_id = %id, "Task cleaned up");
        true
    }
}

/// Delete a task's directory, or its lone file when it has no directory
pub(crate) async fn remove_task_files(
    work_dir: Option<&std::path::Path>,
    file_path: Option<&std::path::Path>,
) {
    let result = match (work_dir, file_path) {
        (Some(dir), _) => tokio::fs::remove_dir_all(dir).await,
        (None, Some(file)) => tokio::fs::remove_file(file).await,
        (None, None) => Ok(()),
    };
    if let Err(e) = result
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(error = %e, "Failed to remove task files");
    }
}
