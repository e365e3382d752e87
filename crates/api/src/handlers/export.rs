//! Handlers for bulk data export.
//!
//! Two shapes of the same snapshot: a zip archive with per-table CSV and
//! JSON entries, and a single SQL upsert script. Both walk the tables in
//! dependency order and record a history row when they finish. Admin-only.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;

use dealerdesk_core::apply::{RunStatus, RunType};
use dealerdesk_core::ordering::TABLE_ORDER;
use dealerdesk_core::record::Record;
use dealerdesk_core::serializer::to_statement_batch;
use dealerdesk_db::bulk::strip_generated;
use dealerdesk_db::repositories::{BackupRunRepo, TableDumpRepo};

use crate::archive;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for the SQL export.
#[derive(Debug, Default, Deserialize)]
pub struct ExportSqlRequest {
    /// Tables to include. Absent or empty means every known table.
    pub tables: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// POST /admin/data/export/archive
// ---------------------------------------------------------------------------

/// Export every known table as a zip archive.
///
/// The response body is the archive itself, served as an attachment with a
/// dated filename. Empty tables are omitted from the archive.
pub async fn export_archive(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let snapshots = fetch_snapshots(&state, TABLE_ORDER).await?;
    let total_records: i64 = snapshots.iter().map(|(_, r)| r.len() as i64).sum();

    let bytes = archive::build(&snapshots)
        .map_err(|e| AppError::InternalError(format!("Failed to build archive: {e}")))?;

    let counts = count_json(&snapshots);
    BackupRunRepo::create_completed(
        &state.pool,
        RunType::Manual,
        RunStatus::Completed,
        total_records,
        &counts,
        admin.user_id,
        Some("archive export"),
    )
    .await?;

    tracing::info!(
        user_id = admin.user_id,
        total_records,
        "exported data archive"
    );

    let filename = format!(
        "dealerdesk-export-{}.zip",
        Utc::now().format("%Y-%m-%d-%H%M%S")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// POST /admin/data/export/sql
// ---------------------------------------------------------------------------

/// Export tables as one SQL script of idempotent upsert batches.
///
/// An unknown table name in the request rejects the whole export before
/// any data is read.
pub async fn export_sql(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    body: Option<Json<ExportSqlRequest>>,
) -> AppResult<impl IntoResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let selected: Vec<&str> = match request.tables.as_deref() {
        None | Some([]) => TABLE_ORDER.to_vec(),
        Some(names) => {
            for name in names {
                if !TABLE_ORDER.contains(&name.as_str()) {
                    return Err(AppError::BadRequest(format!("Unknown table: {name}")));
                }
            }
            // Requested subset, but always in dependency order.
            TABLE_ORDER
                .iter()
                .filter(|t| names.iter().any(|n| n == *t))
                .copied()
                .collect()
        }
    };

    let snapshots = fetch_snapshots(&state, &selected).await?;
    let total_records: i64 = snapshots.iter().map(|(_, r)| r.len() as i64).sum();

    let mut script = String::new();
    script.push_str("-- DealerDesk data export\n");
    script.push_str(&format!("-- Generated: {}\n", Utc::now().to_rfc3339()));
    script.push_str(&format!("-- Tables: {}\n\n", selected.len()));

    for (name, records) in &snapshots {
        if records.is_empty() {
            continue;
        }
        let records = strip_generated(name, records);
        script.push_str(&to_statement_batch(name, &records));
        script.push('\n');
    }

    script.push_str(&format!("-- Total records: {total_records}\n"));

    let counts = count_json(&snapshots);
    BackupRunRepo::create_completed(
        &state.pool,
        RunType::Manual,
        RunStatus::Completed,
        total_records,
        &counts,
        admin.user_id,
        Some("sql export"),
    )
    .await?;

    tracing::info!(
        user_id = admin.user_id,
        tables = selected.len(),
        total_records,
        "exported sql script"
    );

    let filename = format!(
        "dealerdesk-export-{}.sql",
        Utc::now().format("%Y-%m-%d-%H%M%S")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        script,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read whole-table snapshots in the given order.
async fn fetch_snapshots(
    state: &AppState,
    tables: &[&str],
) -> AppResult<Vec<(String, Vec<Record>)>> {
    let mut snapshots = Vec::with_capacity(tables.len());
    for table in tables {
        let records = TableDumpRepo::fetch_all(&state.pool, table).await?;
        snapshots.push((table.to_string(), records));
    }
    Ok(snapshots)
}

fn count_json(snapshots: &[(String, Vec<Record>)]) -> serde_json::Value {
    let counts: IndexMap<&str, usize> = snapshots
        .iter()
        .filter(|(_, r)| !r.is_empty())
        .map(|(name, r)| (name.as_str(), r.len()))
        .collect();
    serde_json::to_value(counts).unwrap_or_default()
}
