//! Engine backed by the external yt-dlp binary

use super::parser::{
    PROGRESS_TEMPLATE, last_error_line, parse_probe_json, parse_progress_line,
};
use super::traits::{MediaEngine, ProgressCallback};
use crate::config::Config;
use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::types::{FetchRequest, ProbeResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Output file template, relative to the per-task directory
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Options passed to every yt-dlp invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YtDlpOptions {
    /// Container used when merging separate streams
    pub merge_output_format: String,
    /// Pass `--restrict-filenames`
    pub restrict_filenames: bool,
    /// Pass `--no-playlist`
    pub no_playlist: bool,
    /// Pass `--ffmpeg-location`
    pub ffmpeg_location: Option<PathBuf>,
    /// Pass `--socket-timeout`
    pub socket_timeout_secs: Option<u64>,
    /// Appended verbatim before the URL
    pub extra_args: Vec<String>,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            merge_output_format: "mp4".to_string(),
            restrict_filenames: true,
            no_playlist: true,
            ffmpeg_location: None,
            socket_timeout_secs: None,
            extra_args: Vec::new(),
        }
    }
}

impl YtDlpOptions {
    /// Options derived from the download and engine sections of the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            merge_output_format: config.download.merge_output_format.clone(),
            restrict_filenames: config.download.restrict_filenames,
            no_playlist: config.download.no_playlist,
            ffmpeg_location: config.engine.ffmpeg_location.clone(),
            socket_timeout_secs: config.engine.socket_timeout_secs,
            extra_args: config.engine.extra_args.clone(),
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }
        if let Some(ref ffmpeg) = self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.display().to_string());
        }
        if let Some(timeout) = self.socket_timeout_secs {
            args.push("--socket-timeout".to_string());
            args.push(timeout.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Engine that shells out to `yt-dlp`
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{MediaEngine, YtDlpEngine};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
///
/// let probe = engine.probe("https://example.com/watch?v=1").await?;
/// # Ok(())
/// # }
/// ```
pub struct YtDlpEngine {
    binary_path: PathBuf,
    options: YtDlpOptions,
}

impl YtDlpEngine {
    /// Create an engine with an explicit binary path and default options
    ///
    /// # Arguments
    ///
    /// * `binary_path` - Path to the yt-dlp binary
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            options: YtDlpOptions::default(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// # Returns
    ///
    /// `Some(YtDlpEngine)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Replace the invocation options
    #[must_use]
    pub fn with_options(mut self, options: YtDlpOptions) -> Self {
        self.options = options;
        self
    }

    /// Arguments for `probe`
    fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["-J".to_string(), "--no-warnings".to_string()];
        args.extend(self.options.common_args());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Arguments for `fetch`
    fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let output = request.output_dir.join(OUTPUT_TEMPLATE);
        let mut args = vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-f".to_string(),
            request.format_expr.clone(),
            "-o".to_string(),
            output.display().to_string(),
            "--merge-output-format".to_string(),
            self.options.merge_output_format.clone(),
        ];
        if self.options.restrict_filenames {
            args.push("--restrict-filenames".to_string());
        }
        args.extend(self.options.common_args());
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractionError {
        ExtractionError::new(
            ExtractionErrorKind::EngineUnavailable,
            format!(
                "failed to execute {}: {}",
                self.binary_path.display(),
                e
            ),
        )
    }
}

/// Error for a non-zero exit, preferring the engine's own `ERROR:` line
fn exit_error(status: std::process::ExitStatus, stderr: &[String]) -> ExtractionError {
    match last_error_line(stderr) {
        Some(message) => ExtractionError::categorize(message),
        None => {
            let tail = stderr
                .iter()
                .rev()
                .map(|l| l.trim())
                .find(|l| !l.is_empty());
            match tail {
                Some(line) => ExtractionError::categorize(line),
                None => ExtractionError::new(
                    ExtractionErrorKind::Other,
                    format!("yt-dlp exited with {}", status),
                ),
            }
        }
    }
}

/// Read `reader` line by line, forwarding progress lines to `progress` and
/// collecting everything else
async fn pump_lines<R>(reader: R, progress: &ProgressCallback<'_>) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut other = Vec::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_progress_line(&line) {
                Some(raw) => progress(raw),
                None => other.push(line),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading yt-dlp output");
                break;
            }
        }
    }
    other
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(&self, url: &str) -> Result<ProbeResult, ExtractionError> {
        let output = Command::new(&self.binary_path)
            .args(self.probe_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr: Vec<String> = String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string)
                .collect();
            return Err(exit_error(output.status, &stderr));
        }

        parse_probe_json(url, &output.stdout)
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressCallback<'_>,
    ) -> Result<PathBuf, ExtractionError> {
        let mut child = Command::new(&self.binary_path)
            .args(self.fetch_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExtractionError::new(
                ExtractionErrorKind::Other,
                "yt-dlp output streams unavailable",
            ));
        };

        // Progress may arrive on either stream depending on quiet mode
        let (stdout_lines, stderr_lines) =
            tokio::join!(pump_lines(stdout, progress), pump_lines(stderr, progress));

        let status = child.wait().await.map_err(|e| {
            ExtractionError::new(
                ExtractionErrorKind::Other,
                format!("failed to wait for yt-dlp: {}", e),
            )
        })?;

        if !status.success() {
            return Err(exit_error(status, &stderr_lines));
        }

        // `--print after_move:filepath` puts the final path on stdout
        let path = stdout_lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                ExtractionError::new(
                    ExtractionErrorKind::Other,
                    "yt-dlp finished without reporting an output file",
                )
            })?;

        tracing::debug!(path = %path.display(), "yt-dlp fetch complete");
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
