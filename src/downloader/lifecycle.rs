//! Shutdown coordination.

use crate::error::Result;
use std::sync::atomic::Ordering;

use super::MediaDownloader;

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new downloads (`start_download` returns `ShuttingDown`)
    /// 2. Stops background services such as the retention sweeper
    /// 3. Waits for in-flight workers, bounded by `download.shutdown_timeout`
    ///
    /// Workers still running after the timeout keep running; their records are
    /// failed by the worker's own guard if the runtime drops them.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        self.shutdown_token.cancel();
        self.workers.close();

        let in_flight = self.workers.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for active downloads to complete");
        }

        let timeout = self.config.download.shutdown_timeout;
        match tokio::time::timeout(timeout, self.workers.wait()).await {
            Ok(()) => tracing::info!("All active downloads completed"),
            Err(_) => tracing::warn!(
                remaining = self.workers.len(),
                "Timeout waiting for downloads to complete, proceeding with shutdown"
            ),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new downloads are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Number of workers that have not finished yet
    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }
}
