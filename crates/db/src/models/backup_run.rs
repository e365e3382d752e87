//! Row model for the `backup_runs` audit table.

use dealerdesk_core::apply::{RunStatus, RunType};
use dealerdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One backup, export, or restore run as persisted in `backup_runs`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BackupRun {
    pub id: DbId,
    /// One of `scheduled`, `manual`, `restore`.
    pub run_type: String,
    /// One of `in_progress`, `completed`, `failed`.
    pub status: String,
    pub total_records: i64,
    /// Per-table record counts, `{ "<table>": <count>, .. }`.
    pub table_counts: serde_json::Value,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// User id of the triggering actor.
    pub initiated_by: DbId,
    pub notes: Option<String>,
}

/// Input for opening a run (status starts as `in_progress`).
#[derive(Debug, Clone)]
pub struct CreateBackupRun {
    pub run_type: RunType,
    pub initiated_by: DbId,
    pub notes: Option<String>,
}

/// Input for closing a run with its final counts.
#[derive(Debug, Clone)]
pub struct CompleteBackupRun {
    pub status: RunStatus,
    pub total_records: i64,
    pub table_counts: serde_json::Value,
    pub notes: Option<String>,
}
