//! Core types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque unique identifier for a download task
///
/// Generated from a random UUID at creation time and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh task id
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Task status
///
/// Transitions only move forward: `Pending → Downloading → {Finished | Error}`,
/// with `Pending → Error` allowed when the fetch fails before reporting progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, worker not yet reporting progress
    Pending,
    /// Worker is receiving bytes from the engine
    Downloading,
    /// File is ready to be fetched
    Finished,
    /// Task failed; see `detail`
    Error,
}

impl TaskStatus {
    /// Terminal states accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Error)
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Finished => "finished",
            TaskStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single encoding reported by a probe
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FormatInfo {
    /// Engine-specific format identifier (e.g., "137")
    pub format_id: String,
    /// Container extension (e.g., "mp4")
    pub ext: Option<String>,
    /// Resolution as "WIDTHxHEIGHT" or an engine label such as "audio only"
    pub resolution: Option<String>,
    /// Frames per second
    pub fps: Option<f64>,
    /// Exact size in bytes, when the provider reports it
    pub filesize: Option<u64>,
    /// Estimated size in bytes
    pub filesize_approx: Option<u64>,
    /// Free-form note from the provider (e.g., "1080p", "medium")
    pub format_note: Option<String>,
    /// Average audio bitrate in kbit/s
    pub abr: Option<f64>,
    /// Video (total) bitrate in kbit/s
    pub vbr: Option<f64>,
    /// Audio codec identifier ("none" when absent)
    pub acodec: Option<String>,
    /// Video codec identifier ("none" when absent)
    pub vcodec: Option<String>,
    /// Whether the format carries an audio stream
    pub has_audio: bool,
    /// Whether the format carries a video stream
    pub has_video: bool,
}

impl FormatInfo {
    /// Video stream without audio
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    /// Audio stream without video
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Height in pixels parsed from `resolution`, 0 when unknown
    pub fn height(&self) -> u32 {
        self.resolution
            .as_deref()
            .and_then(|r| r.split_once('x'))
            .and_then(|(_, h)| h.parse().ok())
            .unwrap_or(0)
    }
}

/// Metadata and available formats for a URL
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProbeResult {
    /// The probed URL
    pub url: String,
    /// Media title
    pub title: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Name of the extractor that handled the URL
    pub extractor: Option<String>,
    /// Whether the URL points at something that can be downloaded
    pub is_downloadable: bool,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Available formats, audio-bearing first, then by height and bitrate
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
    /// The format the engine would pick by default
    #[serde(default)]
    pub default_format_id: Option<String>,
}

/// Request body for POST /probe
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProbeRequest {
    /// URL to inspect (http or https)
    pub url: String,
}

/// Request body for POST /download
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// URL to download (http or https)
    pub url: String,
    /// Format id picked from a previous probe (None = engine default)
    #[serde(default)]
    pub format_id: Option<String>,
    /// Caller hint: the chosen format carries audio
    #[serde(default)]
    pub format_has_audio: Option<bool>,
    /// Caller hint: the chosen format carries video
    #[serde(default)]
    pub format_has_video: Option<bool>,
}

impl DownloadRequest {
    /// The format selection part of the request
    pub fn format_request(&self) -> FormatRequest {
        FormatRequest {
            format_id: self.format_id.clone(),
            has_audio: self.format_has_audio,
            has_video: self.format_has_video,
        }
    }
}

/// A caller's format choice, as seen by the format resolver
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatRequest {
    /// Requested format id
    pub format_id: Option<String>,
    /// Hint: the requested format carries audio
    pub has_audio: Option<bool>,
    /// Hint: the requested format carries video
    pub has_video: Option<bool>,
}

impl FormatRequest {
    /// Whether the hints alone show that no audio pairing is needed
    pub fn hints_are_conclusive(&self) -> bool {
        self.has_audio == Some(true) || self.has_video == Some(false)
    }
}

/// Response body for POST /download
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadStarted {
    /// Id to poll with GET /progress/{task_id}
    pub task_id: TaskId,
}

/// Raw counters reported by the extraction engine during a fetch
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawProgress {
    /// Bytes received so far
    pub downloaded_bytes: u64,
    /// Content length, when known (exact or estimated)
    pub total_bytes: Option<u64>,
    /// Engine's own instantaneous speed estimate in bytes per second
    pub speed: Option<f64>,
}

/// Normalized progress values derived from [`RawProgress`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProgressSample {
    /// Fraction in [0, 1], None when the total is unknown
    pub progress: Option<f64>,
    /// Bytes received so far
    pub downloaded_bytes: u64,
    /// Content length, None when unknown
    pub total_bytes: Option<u64>,
    /// Bytes per second, None when it cannot be estimated
    pub speed: Option<f64>,
    /// Seconds remaining, None when it cannot be estimated
    pub eta: Option<f64>,
}

/// Instruction handed to the engine for one fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Source URL
    pub url: String,
    /// Resolved format expression (may contain a `+` combinator)
    pub format_expr: String,
    /// Directory the engine must write its output into
    pub output_dir: PathBuf,
}

/// Snapshot of a task as returned by GET /progress/{task_id}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task id
    pub task_id: TaskId,
    /// Current status
    pub status: TaskStatus,
    /// Fraction in [0, 1], null when unknown
    pub progress: Option<f64>,
    /// Bytes received so far
    pub downloaded_bytes: u64,
    /// Content length, null until the engine reports one
    pub total_bytes: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<f64>,
    /// Name of the finished file (only when finished)
    pub filename: Option<String>,
    /// The resolved format expression
    pub format_expr: Option<String>,
    /// Failure description (only when status is error)
    #[serde(default)]
    pub detail: Option<String>,
}
