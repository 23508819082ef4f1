//! Background service starters - retention sweeper.

use chrono::Utc;

use super::MediaDownloader;
use super::gateway::remove_task_files;

impl MediaDownloader {
    /// Start the retention sweeper
    ///
    /// Runs every `retention.sweep_interval` until shutdown. Nothing is spawned
    /// when the policy never evicts.
    pub fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        if !self.retention.evicts_anything() {
            tracing::info!(
                policy = self.retention.name(),
                "Retention keeps all tasks, skipping retention sweeper"
            );
            return tokio::spawn(async {});
        }

        let downloader = self.clone();
        let token = self.shutdown_token.clone();
        let period = self.config.retention.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Retention sweeper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        downloader.sweep_now().await;
                    }
                }
            }
        });

        tracing::info!(
            policy = self.retention.name(),
            interval_secs = period.as_secs(),
            "Retention sweeper started"
        );

        handle
    }

    /// Run one retention pass now
    ///
    /// Returns the number of evicted tasks. Their directories are deleted.
    pub async fn sweep_now(&self) -> usize {
        let evicted = self.store.evict(self.retention.as_ref(), Utc::now());
        for record in &evicted {
            remove_task_files(record.work_dir.as_deref(), record.file_path.as_deref()).await;
            tracing::debug!(task_id = %record.id, status = %record.status, "Task evicted");
        }
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), policy = self.retention.name(), "Retention sweep");
        }
        evicted.len()
    }
}
