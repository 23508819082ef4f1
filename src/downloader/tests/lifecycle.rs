use crate::downloader::MediaDownloader;
use crate::downloader::test_helpers::{
    ScriptedEngine, create_test_downloader, step, test_config, wait_for_task,
    wait_until_terminal,
};
use crate::error::{Error, TaskError};
use crate::retention::{RetentionPolicy, TtlRetention};
use crate::task_store::TaskRecord;
use crate::types::{DownloadRequest, TaskStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Evicts every terminal record while borrowing the built-in policy's name
struct EvictTerminalNamedKeepForever;

impl RetentionPolicy for EvictTerminalNamedKeepForever {
    fn should_evict(&self, record: &TaskRecord, _now: DateTime<Utc>) -> bool {
        record.status.is_terminal()
    }

    fn name(&self) -> &'static str {
        "keep-forever"
    }
}

fn request() -> DownloadRequest {
    DownloadRequest {
        url: "https://media.test/watch?v=life".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_shutdown_rejects_new_downloads() {
    let engine = Arc::new(ScriptedEngine::new());
    let (downloader, _temp_dir) = create_test_downloader(engine).await;

    assert!(downloader.is_accepting());
    downloader.shutdown().await.unwrap();
    assert!(!downloader.is_accepting());

    let err = downloader.start_download(request()).await.unwrap_err();
    assert!(matches!(err, Error::ShuttingDown), "got {:?}", err);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_downloads() {
    let (engine, gate) = ScriptedEngine::new()
        .with_steps(vec![step(5, Some(10))])
        .gated();
    let (downloader, _temp_dir) = create_test_downloader(Arc::new(engine)).await;

    let id = downloader.start_download(request()).await.unwrap();
    assert_eq!(downloader.active_workers(), 1);

    let shutdown = {
        let downloader = downloader.clone();
        tokio::spawn(async move { downloader.shutdown().await })
    };
    gate.add_permits(2);
    shutdown.await.unwrap().unwrap();

    let info = downloader.get_progress(id).unwrap();
    assert_eq!(info.status, TaskStatus::Finished);
    assert_eq!(downloader.active_workers(), 0);
}

#[tokio::test]
async fn test_shutdown_timeout_does_not_hang() {
    let (engine, _gate) = ScriptedEngine::new().gated();
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    config.download.shutdown_timeout = Duration::from_millis(50);
    let downloader = MediaDownloader::with_engine(config, Arc::new(engine)).await.unwrap();

    let id = downloader.start_download(request()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), downloader.shutdown())
        .await
        .expect("shutdown should respect its timeout")
        .unwrap();

    // The parked worker is still running
    assert_eq!(downloader.get_progress(id).unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_sweep_evicts_expired_terminal_tasks() {
    let (engine, gate) = ScriptedEngine::new()
        .with_steps(vec![step(1, Some(2))])
        .gated();
    let engine = Arc::new(engine);
    let temp_dir = tempfile::tempdir().unwrap();
    let downloader = MediaDownloader::with_components(
        test_config(&temp_dir),
        engine,
        Arc::new(TtlRetention::new(Some(Duration::ZERO), Some(Duration::ZERO))),
    )
    .await
    .unwrap();

    let done = downloader.start_download(request()).await.unwrap();
    gate.add_permits(2);
    wait_until_terminal(&downloader, done).await;
    let done_dir = downloader.store().get(done).unwrap().work_dir.unwrap();

    let running = downloader.start_download(request()).await.unwrap();
    gate.add_permits(1);
    wait_for_task(&downloader, running, |i| i.status == TaskStatus::Downloading).await;

    assert_eq!(downloader.sweep_now().await, 1);
    assert!(matches!(
        downloader.get_progress(done).unwrap_err(),
        Error::Task(TaskError::NotFound { .. })
    ));
    assert!(!done_dir.exists());
    assert_eq!(
        downloader.get_progress(running).unwrap().status,
        TaskStatus::Downloading,
        "running tasks are never evicted"
    );

    gate.add_permits(1);
    wait_until_terminal(&downloader, running).await;
}

#[tokio::test]
async fn test_background_sweeper_runs_for_custom_policy() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    config.retention.sweep_interval = Duration::from_millis(20);
    let downloader = MediaDownloader::with_components(
        config,
        Arc::new(ScriptedEngine::new()),
        Arc::new(EvictTerminalNamedKeepForever),
    )
    .await
    .unwrap();

    let id = downloader.start_download(request()).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while downloader.get_progress(id).is_ok() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "sweeper never evicted the finished task"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    downloader.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_default_retention_keeps_everything() {
    let engine = Arc::new(ScriptedEngine::new());
    let (downloader, _temp_dir) = create_test_downloader(engine).await;

    let id = downloader.start_download(request()).await.unwrap();
    wait_until_terminal(&downloader, id).await;

    assert_eq!(downloader.sweep_now().await, 0);
    assert!(downloader.get_progress(id).is_ok());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_construction() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    config.download.default_format = String::new();

    let result = MediaDownloader::with_engine(config, Arc::new(ScriptedEngine::new())).await;
    assert!(matches!(result, Err(Error::Config { .. })));
}
