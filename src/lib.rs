//! # media-dl
//!
//! Backend library for a media download service: probe a URL through an
//! extraction engine (yt-dlp), start a background download of a chosen
//! format, poll its progress and fetch the finished file.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Non-blocking** - Starting a download returns a task id immediately
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - The REST API is a thin layer over [`MediaDownloader`]
//! - **Pluggable** - The extraction engine and retention policy are traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadRequest, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     let probe = downloader.probe("https://www.youtube.com/watch?v=BaW_jenozKc").await?;
//!     let format_id = probe.formats.first().map(|f| f.format_id.clone());
//!
//!     let task_id = downloader
//!         .start_download(DownloadRequest {
//!             url: probe.url.clone(),
//!             format_id,
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let info = downloader.get_progress(task_id)?;
//!     println!("{}: {:?}", info.status, info.progress);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Extraction engines (yt-dlp and fallbacks)
pub mod engine;
/// Error types
pub mod error;
/// Format expression resolution
pub mod format_resolver;
/// Progress translation
pub mod progress;
/// Retention policies for finished tasks
pub mod retention;
/// In-memory task registry
pub mod task_store;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use downloader::{DownloadedFile, MediaDownloader};
pub use engine::{MediaEngine, UnavailableEngine, YtDlpEngine};
pub use error::{
    ApiError, Error, ErrorDetail, ExtractionError, ExtractionErrorKind, Result, TaskError,
    ToHttpStatus,
};
pub use retention::{KeepForever, RetentionPolicy, TtlRetention};
pub use task_store::{TaskRecord, TaskStore};
pub use types::{
    DownloadRequest, DownloadStarted, FormatInfo, ProbeResult, TaskId, TaskInfo, TaskStatus,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = MediaDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

/// Serve the REST API until a termination signal arrives, then shut down.
///
/// The listener stops accepting connections first, then the downloader stops
/// accepting new tasks and waits for in-flight downloads.
pub async fn serve_with_shutdown(downloader: std::sync::Arc<MediaDownloader>) -> Result<()> {
    let config = downloader.get_config();
    api::serve(downloader.clone(), config, wait_for_signal()).await?;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
