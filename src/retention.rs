//! Retention policies for finished task records
//!
//! Records stay in the [`TaskStore`](crate::task_store::TaskStore) until a
//! policy selects them for eviction. The default [`KeepForever`] never evicts;
//! [`TtlRetention`] drops terminal records once they are older than a
//! configured age. Records that are still running are never evicted.

use crate::config::RetentionConfig;
use crate::task_store::TaskRecord;
use crate::types::TaskStatus;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Decides which task records may be removed from the store
pub trait RetentionPolicy: Send + Sync {
    /// Whether `record` should be evicted at time `now`
    fn should_evict(&self, record: &TaskRecord, now: DateTime<Utc>) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Whether this policy can ever evict a record
    ///
    /// No retention sweeper is started for policies that return `false`.
    fn evicts_anything(&self) -> bool {
        true
    }
}

/// Never evicts anything
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepForever;

impl RetentionPolicy for KeepForever {
    fn should_evict(&self, _record: &TaskRecord, _now: DateTime<Utc>) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "keep-forever"
    }

    fn evicts_anything(&self) -> bool {
        false
    }
}

/// Evicts terminal records older than a per-status time-to-live
///
/// A `None` TTL keeps records of that status forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlRetention {
    finished_ttl: Option<Duration>,
    failed_ttl: Option<Duration>,
}

impl TtlRetention {
    /// Create a policy with separate TTLs for finished and failed records
    pub fn new(finished_ttl: Option<Duration>, failed_ttl: Option<Duration>) -> Self {
        Self {
            finished_ttl,
            failed_ttl,
        }
    }

    /// Build a policy from the retention section of the configuration
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self::new(config.finished_ttl, config.failed_ttl)
    }

    /// Whether any status is ever evicted
    pub fn is_active(&self) -> bool {
        self.finished_ttl.is_some() || self.failed_ttl.is_some()
    }
}

impl RetentionPolicy for TtlRetention {
    fn should_evict(&self, record: &TaskRecord, now: DateTime<Utc>) -> bool {
        let ttl = match record.status {
            TaskStatus::Finished => self.finished_ttl,
            TaskStatus::Error => self.failed_ttl,
            TaskStatus::Pending | TaskStatus::Downloading => return false,
        };
        let (Some(ttl), Some(finished_at)) = (ttl, record.finished_at) else {
            return false;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        now.signed_duration_since(finished_at) >= ttl
    }

    fn name(&self) -> &'static str {
        "ttl"
    }

    fn evicts_anything(&self) -> bool {
        self.is_active()
    }
}

/// Pick the policy described by the configuration
pub fn policy_from_config(config: &RetentionConfig) -> std::sync::Arc<dyn RetentionPolicy> {
    let ttl = TtlRetention::from_config(config);
    if ttl.is_active() {
        std::sync::Arc::new(ttl)
    } else {
        std::sync::Arc::new(KeepForever)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_store::{NewTask, TaskStore, TaskUpdate};
    use std::path::PathBuf;

    fn record_with(store: &TaskStore, update: Option<TaskUpdate>) -> TaskRecord {
        let id = store.create(NewTask {
            url: "https://example.com/v".to_string(),
            format_expr: "best".to_string(),
            work_root: None,
        });
        if let Some(update) = update {
            store.update(id, update).unwrap();
        }
        store.get(id).unwrap()
    }

    fn finished() -> Option<TaskUpdate> {
        Some(TaskUpdate::Finished {
            filename: "a.mp4".to_string(),
            file_path: PathBuf::from("/tmp/a.mp4"),
        })
    }

    fn failed() -> Option<TaskUpdate> {
        Some(TaskUpdate::Failed {
            detail: "network error: reset".to_string(),
        })
    }

    #[test]
    fn test_keep_forever_never_evicts() {
        let store = TaskStore::new();
        let far_future = Utc::now() + chrono::Duration::days(3650);
        for update in [None, finished(), failed()] {
            let record = record_with(&store, update);
            assert!(!KeepForever.should_evict(&record, far_future));
        }
    }

    #[test]
    fn test_ttl_respects_age() {
        let store = TaskStore::new();
        let record = record_with(&store, finished());
        let policy = TtlRetention::new(Some(Duration::from_secs(60)), None);
        let finished_at = record.finished_at.unwrap();

        assert!(!policy.should_evict(&record, finished_at + chrono::Duration::seconds(30)));
        assert!(policy.should_evict(&record, finished_at + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_ttl_is_per_status() {
        let store = TaskStore::new();
        let done = record_with(&store, finished());
        let broken = record_with(&store, failed());
        let later = Utc::now() + chrono::Duration::hours(1);

        let only_failed = TtlRetention::new(None, Some(Duration::from_secs(1)));
        assert!(!only_failed.should_evict(&done, later));
        assert!(only_failed.should_evict(&broken, later));
    }

    #[test]
    fn test_running_tasks_are_never_evicted() {
        let store = TaskStore::new();
        let pending = record_with(&store, None);
        let policy = TtlRetention::new(Some(Duration::ZERO), Some(Duration::ZERO));
        assert!(!policy.should_evict(&pending, Utc::now() + chrono::Duration::days(1)));
    }

    #[test]
    fn test_policy_from_config() {
        let keep = policy_from_config(&RetentionConfig::default());
        assert_eq!(keep.name(), "keep-forever");

        let config = RetentionConfig {
            finished_ttl: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        assert_eq!(policy_from_config(&config).name(), "ttl");
    }

    #[test]
    fn test_evicts_anything() {
        assert!(!KeepForever.evicts_anything());
        assert!(!TtlRetention::new(None, None).evicts_anything());
        assert!(TtlRetention::new(None, Some(Duration::from_secs(1))).evicts_anything());
    }
}
