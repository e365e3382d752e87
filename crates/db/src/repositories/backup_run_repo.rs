//! Repository for the `backup_runs` table.

use sqlx::PgPool;

use dealerdesk_core::apply::{RunStatus, RunType};
use dealerdesk_core::types::DbId;

use crate::models::backup_run::{BackupRun, CompleteBackupRun, CreateBackupRun};

/// Column list for backup_runs queries.
const COLUMNS: &str = "id, run_type, status, total_records, table_counts, \
    started_at, completed_at, initiated_by, notes";

/// Default page size when listing runs.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
/// Hard cap on the page size.
pub const MAX_LIST_LIMIT: i64 = 200;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Provides append-only access to backup run history.
pub struct BackupRunRepo;

impl BackupRunRepo {
    /// Open a run with status `in_progress`, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateBackupRun) -> Result<BackupRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO backup_runs (run_type, status, initiated_by, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(input.run_type.as_str())
            .bind(RunStatus::InProgress.as_str())
            .bind(input.initiated_by)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Close a run with its final status and counts.
    ///
    /// This is the only update the table ever sees; completed rows are
    /// read-only afterwards.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        input: &CompleteBackupRun,
    ) -> Result<Option<BackupRun>, sqlx::Error> {
        let query = format!(
            "UPDATE backup_runs SET
                status = $2,
                total_records = $3,
                table_counts = $4,
                completed_at = now(),
                notes = COALESCE($5, notes)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(id)
            .bind(input.status.as_str())
            .bind(input.total_records)
            .bind(&input.table_counts)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Record a run that is already finished (export/backup runs whose
    /// outcome is known at insert time).
    pub async fn create_completed(
        pool: &PgPool,
        run_type: RunType,
        status: RunStatus,
        total_records: i64,
        table_counts: &serde_json::Value,
        initiated_by: DbId,
        notes: Option<&str>,
    ) -> Result<BackupRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO backup_runs
                (run_type, status, total_records, table_counts, completed_at, initiated_by, notes)
             VALUES ($1, $2, $3, $4, now(), $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(run_type.as_str())
            .bind(status.as_str())
            .bind(total_records)
            .bind(table_counts)
            .bind(initiated_by)
            .bind(notes)
            .fetch_one(pool)
            .await
    }

    /// Find a run by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BackupRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM backup_runs WHERE id = $1");
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs, newest first, with clamped pagination.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<BackupRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM backup_runs
             ORDER BY started_at DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(clamp_limit(limit))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_to_bounds() {
        assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(25)), 25);
    }

    #[test]
    fn offset_never_negative() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-5)), 0);
        assert_eq!(clamp_offset(Some(30)), 30);
    }
}
