//! Per-run outcome aggregation.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// A file scheduled for upload. Built by the planner, consumed once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadTask {
    pub path: PathBuf,
    pub key: String,
    pub size: u64,
}

/// Stage at which a file was given up on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The directory walk could not read an entry.
    Walk,
    /// No valid object key could be derived from the path.
    Key,
    /// Another file in the same run already maps to this key.
    KeyCollision,
    /// The local file could not be opened.
    Read,
    /// The existence check failed; the upload was not attempted.
    ExistenceCheck,
    /// The backend rejected the upload.
    Transfer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub path: PathBuf,
    pub key: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

/// A file that was uploaded or skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub path: PathBuf,
    pub key: String,
    pub size: u64,
}

/// What happened to one task.
#[derive(Clone, Debug)]
pub enum TaskOutcome {
    Uploaded(ObjectRecord),
    /// The key already existed remotely and overwriting is off.
    Skipped(ObjectRecord),
    Failed(UploadFailure),
}

/// Aggregate result of a `run` or `run_in_parallel` call.
#[derive(Clone, Debug, Serialize)]
pub struct UploadResult {
    pub run_id: Uuid,
    pub uploaded: Vec<ObjectRecord>,
    pub skipped: Vec<ObjectRecord>,
    /// Entries rejected by the filter; a pruned directory counts once.
    pub filtered: usize,
    pub failures: Vec<UploadFailure>,
    pub bytes_uploaded: u64,
    pub elapsed: Duration,
}

impl UploadResult {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            uploaded: Vec::new(),
            skipped: Vec::new(),
            filtered: 0,
            failures: Vec::new(),
            bytes_uploaded: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Uploaded(record) => {
                self.bytes_uploaded += record.size;
                self.uploaded.push(record);
            }
            TaskOutcome::Skipped(record) => self.skipped.push(record),
            TaskOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// True when every eligible file was uploaded or skipped.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Keys uploaded in this run, sorted.
    pub fn uploaded_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.uploaded.iter().map(|r| r.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}
