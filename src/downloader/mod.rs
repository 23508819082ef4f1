//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`gateway`] - Probe, start-download, poll and file retrieval
//! - [`download_task`] - One background worker per task
//! - [`lifecycle`] - Graceful shutdown
//! - [`services`] - Retention sweeper

mod download_task;
mod gateway;
mod lifecycle;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use gateway::DownloadedFile;

use crate::config::Config;
use crate::engine::{self, MediaEngine};
use crate::error::{Error, Result};
use crate::retention::{self, RetentionPolicy};
use crate::task_store::TaskStore;
use gateway::ProbeCache;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Registry of task records; the single source of truth for task state
    pub(crate) store: Arc<TaskStore>,
    /// Extraction engine (trait object for pluggable implementations)
    pub(crate) engine: Arc<dyn MediaEngine>,
    /// Policy deciding which finished records the sweeper evicts
    pub(crate) retention: Arc<dyn RetentionPolicy>,
    /// Tracks spawned download workers so shutdown can wait for them
    pub(crate) workers: TaskTracker,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown_token: CancellationToken,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Format lists from recent probes, keyed by URL
    pub(crate) probe_cache: Arc<ProbeCache>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Creates the download directory
    /// - Selects the extraction engine (yt-dlp if found, otherwise a stub)
    /// - Starts the retention sweeper when a TTL is configured
    pub async fn new(config: Config) -> Result<Self> {
        let engine = engine::engine_from_config(&config);
        Self::with_engine(config, engine).await
    }

    /// Create a downloader that uses the given engine instead of yt-dlp
    pub async fn with_engine(config: Config, engine: Arc<dyn MediaEngine>) -> Result<Self> {
        let retention = retention::policy_from_config(&config.retention);
        Self::with_components(config, engine, retention).await
    }

    /// Create a downloader with an explicit engine and retention policy
    pub async fn with_components(
        config: Config,
        engine: Arc<dyn MediaEngine>,
        retention: Arc<dyn RetentionPolicy>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!(
            engine = engine.name(),
            retention = retention.name(),
            download_dir = %config.download.download_dir.display(),
            "Media downloader initialized"
        );

        let downloader = Self {
            config: Arc::new(config),
            store: Arc::new(TaskStore::new()),
            engine,
            retention,
            workers: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            probe_cache: Arc::new(ProbeCache::default()),
        };

        downloader.start_retention_sweeper();

        Ok(downloader)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The task registry
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Name of the extraction engine in use
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with download processing and listens on the
    /// configured bind address (default: 127.0.0.1:8000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
