//! Configuration types for media-dl

use crate::error::{Error, Result};
use crate::format_resolver::DEFAULT_FORMAT_EXPR;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directories, format defaults, shutdown)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root directory for per-task output directories (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Format expression used when the caller does not pick one (default: "bv*+ba/best")
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Container used when the engine merges separate video and audio streams (default: "mp4")
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,

    /// Restrict output file names to ASCII without spaces (default: true)
    #[serde(default = "default_true")]
    pub restrict_filenames: bool,

    /// Fetch a single item even when the URL points into a playlist (default: true)
    #[serde(default = "default_true")]
    pub no_playlist: bool,

    /// How long shutdown waits for in-flight downloads (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            default_format: default_format(),
            merge_output_format: default_merge_output_format(),
            restrict_filenames: true,
            no_playlist: true,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Extraction engine configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Directory or binary path of ffmpeg, passed to the engine for merging
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,

    /// Network timeout in seconds passed to the engine
    #[serde(default)]
    pub socket_timeout_secs: Option<u64>,

    /// Additional arguments appended to every engine invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            ffmpeg_location: None,
            socket_timeout_secs: None,
            extra_args: Vec::new(),
        }
    }
}

/// Retention of finished task records
///
/// With both TTLs unset, records are kept for the process lifetime.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Evict finished tasks this long after they finished (None = keep)
    #[serde(default, with = "optional_duration_serde")]
    pub finished_ttl: Option<Duration>,

    /// Evict failed tasks this long after they failed (None = keep)
    #[serde(default, with = "optional_duration_serde")]
    pub failed_ttl: Option<Duration>,

    /// How often the retention sweeper runs (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,

    /// Remove a task and its file once the file has been handed to a caller (default: false)
    #[serde(default)]
    pub cleanup_after_fetch: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            finished_ttl: None,
            failed_ttl: None,
            sweep_interval: default_sweep_interval(),
            cleanup_after_fetch: false,
        }
    }
}

/// Main configuration for [`MediaDownloader`](crate::MediaDownloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extraction engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Task record retention
    #[serde(default)]
    pub retention: RetentionConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Check the configuration for values the downloader cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.download.download_dir.as_os_str().is_empty() {
            return Err(config_error("download_dir must not be empty", "download_dir"));
        }
        if self.download.default_format.trim().is_empty() {
            return Err(config_error(
                "default_format must not be empty",
                "default_format",
            ));
        }
        if self.download.merge_output_format.trim().is_empty() {
            return Err(config_error(
                "merge_output_format must not be empty",
                "merge_output_format",
            ));
        }
        if self.retention.sweep_interval.is_zero() {
            return Err(config_error(
                "sweep_interval must be greater than zero",
                "sweep_interval",
            ));
        }
        if self.engine.socket_timeout_secs == Some(0) {
            return Err(config_error(
                "socket_timeout_secs must be greater than zero",
                "socket_timeout_secs",
            ));
        }
        for origin in &self.server.api.cors_origins {
            if origin != "*" && url::Url::parse(origin).is_err() {
                return Err(config_error(
                    format!("invalid CORS origin '{}'", origin),
                    "cors_origins",
                ));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_format() -> String {
    DEFAULT_FORMAT_EXPR.to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
