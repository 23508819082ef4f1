//! Common test utilities for media-dl integration tests

use async_trait::async_trait;
use media_dl::engine::ProgressCallback;
use media_dl::types::{FetchRequest, RawProgress};
use media_dl::{
    Config, ExtractionError, FormatInfo, MediaDownloader, MediaEngine, ProbeResult, TaskId,
    TaskInfo,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Engine that reports a fixed probe result and writes a small file on fetch
pub struct FakeEngine {
    pub formats: Vec<FormatInfo>,
    pub fail_with: Option<ExtractionError>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            formats: vec![
                FormatInfo {
                    format_id: "137".to_string(),
                    ext: Some("mp4".to_string()),
                    resolution: Some("1920x1080".to_string()),
                    vcodec: Some("avc1.640028".to_string()),
                    acodec: Some("none".to_string()),
                    has_video: true,
                    ..Default::default()
                },
                FormatInfo {
                    format_id: "140".to_string(),
                    ext: Some("m4a".to_string()),
                    abr: Some(128.0),
                    vcodec: Some("none".to_string()),
                    acodec: Some("mp4a.40.2".to_string()),
                    has_audio: true,
                    ..Default::default()
                },
            ],
            fail_with: None,
        }
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(&self, url: &str) -> Result<ProbeResult, ExtractionError> {
        Ok(ProbeResult {
            url: url.to_string(),
            title: Some("Integration Clip".to_string()),
            is_downloadable: true,
            formats: self.formats.clone(),
            ..Default::default()
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &ProgressCallback<'_>,
    ) -> Result<PathBuf, ExtractionError> {
        for downloaded in [0u64, 256, 512, 1024] {
            progress(RawProgress {
                downloaded_bytes: downloaded,
                total_bytes: Some(1024),
                speed: Some(1024.0),
            });
            tokio::task::yield_now().await;
        }
        if let Some(ref e) = self.fail_with {
            return Err(e.clone());
        }

        let path = request
            .output_dir
            .join(format!("clip-{}.mp4", request.format_expr.replace('+', "_")));
        tokio::fs::write(&path, vec![7u8; 1024]).await.unwrap();
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Downloader rooted in a fresh temporary directory
pub async fn downloader_with(engine: FakeEngine) -> (MediaDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    let downloader = MediaDownloader::with_engine(config, Arc::new(engine))
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Poll a task until it reaches a terminal state
pub async fn wait_until_terminal(downloader: &MediaDownloader, id: TaskId) -> TaskInfo {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let info = downloader.get_progress(id).unwrap();
        if info.status.is_terminal() {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} did not finish: {:?}",
            id,
            info
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
