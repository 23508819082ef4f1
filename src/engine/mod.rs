//! Media extraction engines
//!
//! The orchestrator only talks to the [`MediaEngine`] trait. Two
//! implementations are provided:
//!
//! - [`YtDlpEngine`]: drives the external `yt-dlp` binary
//! - [`UnavailableEngine`]: stub used when no binary is available, failing
//!   every call with [`ExtractionErrorKind::EngineUnavailable`]
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::engine::{MediaEngine, YtDlpEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = YtDlpEngine::from_path().expect("yt-dlp binary not found");
//!
//!     let probe = engine.probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     for format in &probe.formats {
//!         println!("{} {:?}", format.format_id, format.resolution);
//!     }
//!     Ok(())
//! }
//! ```

mod parser;
mod traits;
mod unavailable;
mod ytdlp;

pub use parser::{categorize_error, parse_probe_json, parse_progress_line};
pub use traits::{MediaEngine, ProgressCallback};
pub use unavailable::UnavailableEngine;
pub use ytdlp::{YtDlpEngine, YtDlpOptions};

use crate::config::Config;
use crate::error::ExtractionErrorKind;
use std::sync::Arc;

/// Build the engine described by the configuration
///
/// An explicit `ytdlp_path` wins; otherwise PATH is searched when
/// `search_path` is enabled. Falls back to [`UnavailableEngine`].
pub fn engine_from_config(config: &Config) -> Arc<dyn MediaEngine> {
    let options = YtDlpOptions::from_config(config);

    let engine: Arc<dyn MediaEngine> = if let Some(ref path) = config.engine.ytdlp_path {
        Arc::new(YtDlpEngine::new(path.clone()).with_options(options))
    } else if config.engine.search_path {
        YtDlpEngine::from_path()
            .map(|e| Arc::new(e.with_options(options)) as Arc<dyn MediaEngine>)
            .unwrap_or_else(|| Arc::new(UnavailableEngine))
    } else {
        Arc::new(UnavailableEngine)
    };

    if engine.name() == UnavailableEngine.name() {
        tracing::warn!("yt-dlp not found; probe and download requests will fail");
    } else {
        tracing::info!(engine = engine.name(), "Extraction engine initialized");
    }
    engine
}
