//! Stub engine used when no extraction binary is available

use super::traits::{MediaEngine, ProgressCallback};
use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::types::{FetchRequest, ProbeResult};
use async_trait::async_trait;
use std::path::PathBuf;

const MISSING_BINARY: &str =
    "yt-dlp binary not found. Configure engine.ytdlp_path or ensure yt-dlp is in PATH.";

/// Engine that fails every call
///
/// Lets the service start and answer progress queries even when the
/// extraction binary is missing.
pub struct UnavailableEngine;

#[async_trait]
impl MediaEngine for UnavailableEngine {
    async fn probe(&self, _url: &str) -> Result<ProbeResult, ExtractionError> {
        Err(ExtractionError::new(
            ExtractionErrorKind::EngineUnavailable,
            MISSING_BINARY,
        ))
    }

    async fn fetch(
        &self,
        _request: &FetchRequest,
        _progress: &ProgressCallback<'_>,
    ) -> Result<PathBuf, ExtractionError> {
        Err(ExtractionError::new(
            ExtractionErrorKind::EngineUnavailable,
            MISSING_BINARY,
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
