//! In-memory task registry
//!
//! [`TaskStore`] maps task ids to their records and is the single source of
//! truth for status and progress. The registry map sits behind one `RwLock`
//! that is only taken exclusively to insert or evict entries; every record has
//! its own `RwLock`, so updates to different tasks never contend and readers
//! copy a record without ever observing a half-applied update.
//!
//! Locks are `std::sync` locks: critical sections are a clone or a field
//! assignment and are never held across an `.await`.

use crate::error::{Result, TaskError};
use crate::retention::RetentionPolicy;
use crate::types::{ProgressSample, TaskId, TaskInfo, TaskStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Mutable state of one fetch operation
#[derive(Clone, Debug, PartialEq)]
pub struct TaskRecord {
    /// Task id
    pub id: TaskId,
    /// Source URL
    pub url: String,
    /// Current status
    pub status: TaskStatus,
    /// Fraction in [0, 1], None when unknown
    pub progress: Option<f64>,
    /// Highest fraction ever reported; later known values never fall below it
    pub peak_progress: Option<f64>,
    /// Bytes received so far
    pub downloaded_bytes: u64,
    /// Content length, None until reported
    pub total_bytes: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<f64>,
    /// Name of the finished file
    pub filename: Option<String>,
    /// Location of the finished file on disk
    pub file_path: Option<PathBuf>,
    /// Per-task working directory
    pub work_dir: Option<PathBuf>,
    /// Resolved format expression
    pub format_expr: String,
    /// Failure description
    pub detail: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last applied update
    pub updated_at: DateTime<Utc>,
    /// Time the task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn new(id: TaskId, task: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id,
            url: task.url,
            status: TaskStatus::Pending,
            progress: Some(0.0),
            peak_progress: None,
            downloaded_bytes: 0,
            total_bytes: None,
            speed: None,
            eta: None,
            filename: None,
            file_path: None,
            work_dir: task.work_root.map(|root| root.join(id.to_string())),
            format_expr: task.format_expr,
            detail: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Apply one transition, enforcing the record invariants.
    ///
    /// On error the record is left untouched.
    pub fn apply(&mut self, update: TaskUpdate) -> std::result::Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(self.rejected(update.operation()));
        }

        let now = Utc::now();
        match update {
            TaskUpdate::Progress(sample) => {
                self.status = TaskStatus::Downloading;
                // An unknown sample hides the value but keeps the high-water mark
                self.progress = match (sample.progress, self.peak_progress) {
                    (Some(new), Some(peak)) => Some(new.max(peak)),
                    (new, _) => new,
                };
                if let Some(p) = self.progress {
                    self.peak_progress = Some(self.peak_progress.map_or(p, |peak| peak.max(p)));
                }
                self.downloaded_bytes = sample.downloaded_bytes;
                self.total_bytes = sample
                    .total_bytes
                    .map(|t| t.max(sample.downloaded_bytes));
                self.speed = sample.speed;
                self.eta = sample.eta;
            }
            TaskUpdate::Finished {
                filename,
                file_path,
            } => {
                if filename.is_empty() {
                    return Err(self.rejected("finish with an empty filename"));
                }
                self.status = TaskStatus::Finished;
                self.progress = Some(1.0);
                self.peak_progress = Some(1.0);
                self.speed = None;
                self.eta = Some(0.0);
                self.filename = Some(filename);
                self.file_path = Some(file_path);
                self.detail = None;
                self.finished_at = Some(now);
            }
            TaskUpdate::Failed { detail } => {
                let detail = if detail.trim().is_empty() {
                    "download failed".to_string()
                } else {
                    detail
                };
                self.status = TaskStatus::Error;
                self.speed = None;
                self.eta = None;
                self.filename = None;
                self.file_path = None;
                self.detail = Some(detail);
                self.finished_at = Some(now);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    fn rejected(&self, operation: &str) -> TaskError {
        TaskError::InvalidTransition {
            id: self.id,
            operation: operation.to_string(),
            current_state: self.status.to_string(),
        }
    }
}

impl From<&TaskRecord> for TaskInfo {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            progress: record.progress,
            downloaded_bytes: record.downloaded_bytes,
            total_bytes: record.total_bytes,
            speed: record.speed,
            eta: record.eta,
            filename: record.filename.clone(),
            format_expr: Some(record.format_expr.clone()),
            detail: record.detail.clone(),
        }
    }
}

impl From<TaskRecord> for TaskInfo {
    fn from(record: TaskRecord) -> Self {
        Self::from(&record)
    }
}

/// Parameters for creating a task record
#[derive(Clone, Debug)]
pub struct NewTask {
    /// Source URL
    pub url: String,
    /// Resolved format expression
    pub format_expr: String,
    /// Directory under which the task's own `<task_id>` directory lives
    pub work_root: Option<PathBuf>,
}

/// One atomic state transition
#[derive(Clone, Debug, PartialEq)]
pub enum TaskUpdate {
    /// Progress report; moves pending → downloading
    Progress(ProgressSample),
    /// Fetch completed
    Finished {
        /// File name shown to callers
        filename: String,
        /// Location on disk
        file_path: PathBuf,
    },
    /// Fetch failed
    Failed {
        /// Human-readable reason
        detail: String,
    },
}

impl TaskUpdate {
    fn operation(&self) -> &'static str {
        match self {
            TaskUpdate::Progress(_) => "report progress on",
            TaskUpdate::Finished { .. } => "finish",
            TaskUpdate::Failed { .. } => "fail",
        }
    }
}

type SharedRecord = Arc<RwLock<TaskRecord>>;

/// Concurrency-safe registry of task records
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, SharedRecord>>,
}

impl TaskStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pending record and return its id
    pub fn create(&self, task: NewTask) -> TaskId {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = TaskId::new();
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }
        let record = TaskRecord::new(id, task);
        tasks.insert(id, Arc::new(RwLock::new(record)));
        id
    }

    /// Immutable copy of a record
    pub fn get(&self, id: TaskId) -> Result<TaskRecord> {
        let record = self.record(id)?;
        let snapshot = record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(snapshot)
    }

    /// Apply one transition to one record
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] when the id is unknown
    /// - [`TaskError::InvalidTransition`] when the record is terminal or the
    ///   update would break an invariant
    pub fn update(&self, id: TaskId, update: TaskUpdate) -> Result<()> {
        let record = self.record(id)?;
        let mut guard = record.write().unwrap_or_else(PoisonError::into_inner);
        guard.apply(update)?;
        Ok(())
    }

    /// Snapshot of every record, oldest first
    pub fn list(&self) -> Vec<TaskRecord> {
        let records: Vec<SharedRecord> = self
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut snapshots: Vec<TaskRecord> = records
            .iter()
            .map(|r| r.read().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();
        snapshots.sort_by_key(|r| r.created_at);
        snapshots
    }

    /// Remove one record, returning its final state
    pub fn remove(&self, id: TaskId) -> Option<TaskRecord> {
        let removed = self
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)?;
        let record = removed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Some(record)
    }

    /// Remove every record the policy selects and return them
    pub fn evict(&self, policy: &dyn RetentionPolicy, now: DateTime<Utc>) -> Vec<TaskRecord> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let mut evicted = Vec::new();

        tasks.retain(|_, record| {
            let snapshot = record.read().unwrap_or_else(PoisonError::into_inner);
            if policy.should_evict(&snapshot, now) {
                evicted.push(snapshot.clone());
                false
            } else {
                true
            }
        });

        evicted
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: TaskId) -> Result<SharedRecord> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound { id }.into())
    }
}
