//! Per-table outcome types for bulk apply runs, and the run-level
//! status/type enums persisted to backup history.

use serde::{Deserialize, Serialize};

/// Outcome of applying one table's records. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Table the records were applied to.
    pub table: String,
    /// Whether the per-table upsert batch succeeded.
    pub success: bool,
    /// Number of records applied (0 on failure).
    pub records_applied: usize,
    /// Raw backend error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyResult {
    pub fn ok(table: impl Into<String>, records_applied: usize) -> Self {
        Self {
            table: table.into(),
            success: true,
            records_applied,
            error: None,
        }
    }

    pub fn failed(table: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            success: false,
            records_applied: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate counts over a run's [`ApplyResult`] sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_tables: usize,
    pub successful_tables: usize,
    pub total_records: usize,
}

/// Derive the run summary from per-table results.
pub fn summarize(results: &[ApplyResult]) -> RunSummary {
    RunSummary {
        total_tables: results.len(),
        successful_tables: results.iter().filter(|r| r.success).count(),
        total_records: results.iter().map(|r| r.records_applied).sum(),
    }
}

// ---------------------------------------------------------------------------
// Run type / status
// ---------------------------------------------------------------------------

/// What triggered a backup-history run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Scheduled,
    Manual,
    Restore,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
            Self::Restore => "restore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "manual" => Some(Self::Manual),
            "restore" => Some(Self::Restore),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["scheduled", "manual", "restore"];
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a backup-history run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["in_progress", "completed", "failed"];
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run completes `Completed` only when every table succeeded.
pub fn derive_status(results: &[ApplyResult]) -> RunStatus {
    if results.iter().all(|r| r.success) {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    }
}
