//! The extraction engine seam

use crate::error::ExtractionError;
use crate::types::{FetchRequest, ProbeResult, RawProgress};
use async_trait::async_trait;
use std::path::PathBuf;

/// Callback receiving raw transfer counters during a fetch
pub type ProgressCallback<'a> = dyn Fn(RawProgress) + Send + Sync + 'a;

/// Trait for media inspection and extraction
///
/// Implementations can drive an external binary, talk to a library, or
/// script canned responses for tests.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Inspect a URL and list its available formats
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractionError`] when the URL is unsupported, the content
    /// is unavailable, or the engine cannot be run.
    async fn probe(&self, url: &str) -> Result<ProbeResult, ExtractionError>;

    /// Fetch `request.url` in `request.format_expr` into `request.output_dir`
    ///
    /// `progress` is invoked zero or more times while bytes arrive. A `+` in
    /// the format expression asks the engine to download both streams and mux
    /// them into one container.
    ///
    /// # Returns
    ///
    /// Path of the final file on disk.
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressCallback<'_>,
    ) -> Result<PathBuf, ExtractionError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
