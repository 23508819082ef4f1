//! Shared test helpers: a scripted in-memory engine and downloader constructors.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::engine::{MediaEngine, ProgressCallback};
use crate::error::ExtractionError;
use crate::types::{FetchRequest, FormatInfo, ProbeResult, RawProgress, TaskId, TaskInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Semaphore;

/// How a scripted fetch ends after its progress steps
#[derive(Clone, Debug)]
pub(crate) enum FetchOutcome {
    /// Write `contents` to `<output_dir>/<filename>` and return that path
    Success {
        filename: String,
        contents: Vec<u8>,
    },
    /// Return the error
    Fail(ExtractionError),
    /// Panic inside the engine
    Panic(String),
    /// Report a path that was never written
    MissingFile,
}

/// In-memory engine with canned probe results and fetch behavior
pub(crate) struct ScriptedEngine {
    probe_result: Result<ProbeResult, ExtractionError>,
    steps: Vec<RawProgress>,
    outcome: FetchOutcome,
    gate: Option<Arc<Semaphore>>,
    probe_calls: AtomicUsize,
    fetch_requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedEngine {
    /// Probe returns [`sample_formats`]; fetch writes "Test_Clip.mp4"
    pub(crate) fn new() -> Self {
        Self {
            probe_result: Ok(ProbeResult {
                title: Some("Test Clip".to_string()),
                is_downloadable: true,
                formats: sample_formats(),
                default_format_id: Some("137+140".to_string()),
                ..Default::default()
            }),
            steps: Vec::new(),
            outcome: FetchOutcome::Success {
                filename: "Test_Clip.mp4".to_string(),
                contents: b"not really a video".to_vec(),
            },
            gate: None,
            probe_calls: AtomicUsize::new(0),
            fetch_requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_probe(mut self, result: Result<ProbeResult, ExtractionError>) -> Self {
        self.probe_result = result;
        self
    }

    pub(crate) fn with_steps(mut self, steps: Vec<RawProgress>) -> Self {
        self.steps = steps;
        self
    }

    pub(crate) fn with_outcome(mut self, outcome: FetchOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Every progress step and the final outcome wait for one permit
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_requests(&self) -> Vec<FetchRequest> {
        self.fetch_requests.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        if let Some(ref gate) = self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn probe(&self, url: &str) -> Result<ProbeResult, ExtractionError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe_result.clone().map(|mut result| {
            result.url = url.to_string();
            result
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressCallback<'_>,
    ) -> Result<PathBuf, ExtractionError> {
        self.fetch_requests.lock().unwrap().push(request.clone());

        for step in &self.steps {
            self.pass_gate().await;
            progress(*step);
        }
        self.pass_gate().await;

        match &self.outcome {
            FetchOutcome::Success { filename, contents } => {
                let path = request.output_dir.join(filename);
                tokio::fs::write(&path, contents).await.unwrap();
                Ok(path)
            }
            FetchOutcome::Fail(e) => Err(e.clone()),
            FetchOutcome::Panic(message) => panic!("{}", message),
            FetchOutcome::MissingFile => Ok(request.output_dir.join("never-written.mp4")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// 137 video-only, 140 audio-only (128 kbit/s), 18 muxed
pub(crate) fn sample_formats() -> Vec<FormatInfo> {
    vec![
        FormatInfo {
            format_id: "18".to_string(),
            ext: Some("mp4".to_string()),
            resolution: Some("640x360".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            vcodec: Some("avc1.42001E".to_string()),
            has_audio: true,
            has_video: true,
            ..Default::default()
        },
        FormatInfo {
            format_id: "140".to_string(),
            ext: Some("m4a".to_string()),
            resolution: Some("audio only".to_string()),
            abr: Some(128.0),
            acodec: Some("mp4a.40.2".to_string()),
            vcodec: Some("none".to_string()),
            has_audio: true,
            has_video: false,
            ..Default::default()
        },
        FormatInfo {
            format_id: "137".to_string(),
            ext: Some("mp4".to_string()),
            resolution: Some("1920x1080".to_string()),
            acodec: Some("none".to_string()),
            vcodec: Some("avc1.640028".to_string()),
            has_audio: false,
            has_video: true,
            ..Default::default()
        },
    ]
}

/// Raw counters for one progress step
pub(crate) fn step(downloaded: u64, total: Option<u64>) -> RawProgress {
    RawProgress {
        downloaded_bytes: downloaded,
        total_bytes: total,
        speed: None,
    }
}

/// Config rooted in a fresh temporary directory
pub(crate) fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.shutdown_timeout = Duration::from_secs(5);
    config
}

/// Helper to create a test MediaDownloader backed by `engine`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    engine: Arc<ScriptedEngine>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir);
    let downloader = MediaDownloader::with_engine(config, engine).await.unwrap();
    (downloader, temp_dir)
}

/// Poll until `check` accepts the task snapshot, failing after five seconds
pub(crate) async fn wait_for_task(
    downloader: &MediaDownloader,
    id: TaskId,
    check: impl Fn(&TaskInfo) -> bool,
) -> TaskInfo {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let info = downloader.get_progress(id).unwrap();
        if check(&info) {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for task {}, last state: {:?}",
            id,
            info
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until the task reaches a terminal state
pub(crate) async fn wait_until_terminal(downloader: &MediaDownloader, id: TaskId) -> TaskInfo {
    wait_for_task(downloader, id, |info| info.status.is_terminal()).await
}
