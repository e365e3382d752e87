//! Handlers for on-demand backup runs and the run history.
//!
//! A backup run here records a snapshot of table counts and optionally
//! mails a summary; the archive itself is produced by the export
//! endpoints. Notification failure never fails the run. Admin-only.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::json;

use dealerdesk_core::apply::{RunStatus, RunType};
use dealerdesk_core::ordering::TABLE_ORDER;
use dealerdesk_core::types::DbId;
use dealerdesk_db::repositories::{BackupRunRepo, TableDumpRepo};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::notifications::email;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for triggering a backup run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerBackupRequest {
    /// Address to mail the run summary to. Absent means no mail.
    pub notification_email: Option<String>,
    /// Marks the run notes as a test run.
    #[serde(default)]
    pub test: bool,
    /// Set by the cron caller; records the run as `scheduled` rather than
    /// `manual`.
    #[serde(default)]
    pub scheduled: bool,
}

/// Query string for the history listing.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /admin/data/backup
// ---------------------------------------------------------------------------

/// Run a backup: count every known table, record the run, optionally mail
/// a summary.
pub async fn trigger_backup(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    body: Option<Json<TriggerBackupRequest>>,
) -> AppResult<impl IntoResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let mut counts: IndexMap<&str, i64> = IndexMap::new();
    let mut total_records: i64 = 0;
    for table in TABLE_ORDER {
        let count = TableDumpRepo::count(&state.pool, table).await?;
        total_records += count;
        counts.insert(table, count);
    }

    let notes = if request.test {
        "test backup"
    } else if request.scheduled {
        "scheduled backup"
    } else {
        "manual backup"
    };
    let run_type = if request.scheduled {
        RunType::Scheduled
    } else {
        RunType::Manual
    };
    let run = BackupRunRepo::create_completed(
        &state.pool,
        run_type,
        RunStatus::Completed,
        total_records,
        &serde_json::to_value(&counts).unwrap_or_default(),
        admin.user_id,
        Some(notes),
    )
    .await?;

    tracing::info!(
        user_id = admin.user_id,
        run_id = run.id,
        total_records,
        "backup run recorded"
    );

    let notified = match &request.notification_email {
        Some(address) => notify(&state, address, run.id, total_records, &counts).await,
        None => false,
    };

    Ok(Json(DataResponse {
        data: json!({
            "run": run,
            "notificationSent": notified,
        }),
    }))
}

// ---------------------------------------------------------------------------
// GET /admin/data/history
// ---------------------------------------------------------------------------

/// List past runs, newest first.
pub async fn list_history(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let runs = BackupRunRepo::list(&state.pool, query.limit, query.offset).await?;
    Ok(Json(DataResponse { data: runs }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Send the summary mail; a failure is logged and swallowed.
async fn notify(
    state: &AppState,
    address: &str,
    run_id: DbId,
    total_records: i64,
    counts: &IndexMap<&str, i64>,
) -> bool {
    let Some(smtp) = &state.config.smtp else {
        tracing::warn!(run_id, "backup notification requested but SMTP is not configured");
        return false;
    };

    match email::send_backup_summary(smtp, address, run_id, total_records, counts).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(run_id, error = %err, "failed to send backup notification");
            false
        }
    }
}
