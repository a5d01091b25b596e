//! Run and dataset reports

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// How a dataset's run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DatasetOutcome {
    /// Every listed object was attempted
    Completed,
    /// No recognized objects under the prefix; informational
    NoObjectsFound,
    /// The prefix could not be listed
    EnumerationFailed { reason: String },
    /// The run was cancelled before every object was attempted
    Cancelled,
}

impl DatasetOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DatasetOutcome::Completed => "completed",
            DatasetOutcome::NoObjectsFound => "no objects found",
            DatasetOutcome::EnumerationFailed { .. } => "enumeration failed",
            DatasetOutcome::Cancelled => "cancelled",
        }
    }
}

/// Error kind of a failed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Read,
    Transform,
    Write,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Read => write!(f, "read"),
            FailureKind::Transform => write!(f, "transform"),
            FailureKind::Write => write!(f, "write"),
        }
    }
}

/// One failed source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFailure {
    pub key: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ObjectFailure {
    /// Build from a per-object pipeline error
    pub fn from_error(error: &PipelineError) -> Option<Self> {
        let (key, kind, reason) = match error {
            PipelineError::Read { key, source } => (key, FailureKind::Read, source.to_string()),
            PipelineError::Transform { key, source } => {
                (key, FailureKind::Transform, source.to_string())
            }
            PipelineError::Write { key, source } => (key, FailureKind::Write, source.to_string()),
            PipelineError::Configuration(_) | PipelineError::Enumeration { .. } => return None,
        };
        Some(Self {
            key: key.clone(),
            kind,
            reason,
        })
    }
}

impl std::fmt::Display for ObjectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.key, self.kind, self.reason)
    }
}

/// One destination object written by the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenObject {
    pub source_key: String,
    pub destination_key: String,
    pub rows: usize,
    pub bytes: u64,
    /// SHA-256 of the written bytes, hex encoded
    pub sha256: String,
}

/// Statistics for one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReport {
    pub dataset: String,
    pub outcome: DatasetOutcome,
    /// Objects transformed and written
    pub processed: usize,
    /// Objects under the prefix without the input suffix
    pub skipped: usize,
    /// Objects that failed to read, transform or write
    pub failed: usize,
    /// Recognized objects never started because the run was cancelled
    pub not_started: usize,
    /// First failures, at most `max_failure_reasons`
    pub failures: Vec<ObjectFailure>,
    /// Whether `failures` is shorter than `failed`
    pub failures_truncated: bool,
    pub rows_written: usize,
    pub bytes_written: u64,
    pub written: Vec<WrittenObject>,
    #[serde(skip)]
    pub duration: Duration,
    #[serde(skip)]
    max_failures: usize,
}

impl DatasetReport {
    pub fn new(dataset: impl Into<String>, max_failures: usize) -> Self {
        Self {
            dataset: dataset.into(),
            outcome: DatasetOutcome::Completed,
            processed: 0,
            skipped: 0,
            failed: 0,
            not_started: 0,
            failures: Vec::new(),
            failures_truncated: false,
            rows_written: 0,
            bytes_written: 0,
            written: Vec::new(),
            duration: Duration::ZERO,
            max_failures,
        }
    }

    /// Count a failure, keeping only the first `max_failures` reasons
    pub fn record_failure(&mut self, failure: ObjectFailure) {
        self.failed += 1;
        if self.failures.len() < self.max_failures {
            self.failures.push(failure);
        } else {
            self.failures_truncated = true;
        }
    }

    pub fn record_written(&mut self, written: WrittenObject) {
        self.processed += 1;
        self.rows_written += written.rows;
        self.bytes_written += written.bytes;
        self.written.push(written);
    }

    /// Whether every attempted object succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !matches!(self.outcome, DatasetOutcome::EnumerationFailed { .. })
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let millis = self.duration.as_millis();
        let secs = self.duration.as_secs();
        if secs == 0 {
            format!("{}ms", millis)
        } else if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Datasets in the order they were run
    pub datasets: Vec<DatasetReport>,
    pub cancelled: bool,
}

impl PipelineReport {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            datasets: Vec::new(),
            cancelled: false,
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.dataset == name)
    }

    pub fn total_processed(&self) -> usize {
        self.datasets.iter().map(|d| d.processed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.datasets.iter().map(|d| d.skipped).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.datasets.iter().map(|d| d.failed).sum()
    }

    /// Whether no dataset failed to enumerate and no object failed
    pub fn is_clean(&self) -> bool {
        self.datasets.iter().all(DatasetReport::is_clean)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Pipeline run {}", self.run_id);

        for dataset in &self.datasets {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{}: {} ({})",
                dataset.dataset,
                dataset.outcome.label(),
                dataset.duration_string()
            );
            if let DatasetOutcome::EnumerationFailed { reason } = &dataset.outcome {
                let _ = writeln!(out, "  Reason: {}", reason);
                continue;
            }
            let _ = writeln!(out, "  Processed:   {}", dataset.processed);
            let _ = writeln!(out, "  Skipped:     {}", dataset.skipped);
            let _ = writeln!(out, "  Failed:      {}", dataset.failed);
            if dataset.not_started > 0 {
                let _ = writeln!(out, "  Not started: {}", dataset.not_started);
            }
            let _ = writeln!(out, "  Rows written: {}", dataset.rows_written);
            for failure in &dataset.failures {
                let _ = writeln!(out, "  - {}", failure);
            }
            if dataset.failures_truncated {
                let _ = writeln!(
                    out,
                    "  ... and {} more",
                    dataset.failed - dataset.failures.len()
                );
            }
        }

        let _ = writeln!(out);
        let _ = write!(
            out,
            "Total: {} processed, {} skipped, {} failed",
            self.total_processed(),
            self.total_skipped(),
            self.total_failed()
        );
        if self.cancelled {
            let _ = write!(out, " (cancelled)");
        }
        out
    }
}
