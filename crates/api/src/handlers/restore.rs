//! Handlers for bulk data restore and SQL import.
//!
//! All three endpoints funnel into the same table-ordered upsert engine.
//! A table that fails keeps its transaction isolated; the failure is
//! reported inside a 200 body, never as an HTTP error. Admin-only.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::json;

use dealerdesk_core::apply::{
    derive_status, summarize, ApplyResult, RunStatus, RunType,
};
use dealerdesk_core::record::{record_from_json, Record};
use dealerdesk_core::sql_parser::{extract_inserts, extract_inserts_strict};
use dealerdesk_db::models::backup_run::{CompleteBackupRun, CreateBackupRun};
use dealerdesk_db::repositories::BackupRunRepo;
use dealerdesk_db::{bulk, DbPool};

use crate::archive;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// What to do with uploaded data: inspect it or write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreAction {
    Preview,
    Restore,
}

/// Request body for the JSON restore endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub action: RestoreAction,
    /// `{ "<table>": [ { <column>: <value>, .. }, .. ], .. }`
    pub table_data: IndexMap<String, Vec<serde_json::Value>>,
}

/// Query string for the archive restore endpoint (the body is the zip).
#[derive(Debug, Deserialize)]
pub struct RestoreArchiveQuery {
    #[serde(default = "default_preview")]
    pub action: RestoreAction,
}

fn default_preview() -> RestoreAction {
    RestoreAction::Preview
}

/// Request body for the SQL import endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSqlRequest {
    pub sql_text: String,
    pub action: RestoreAction,
    /// When set, any unparseable statement rejects the whole import.
    #[serde(default)]
    pub strict: bool,
}

// ---------------------------------------------------------------------------
// POST /admin/data/restore
// ---------------------------------------------------------------------------

/// Restore (or preview) a table-to-records mapping supplied as JSON.
pub async fn restore(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<RestoreRequest>,
) -> AppResult<impl IntoResponse> {
    let tables = revive_tables(request.table_data)?;

    match request.action {
        RestoreAction::Preview => preview_response(&tables),
        RestoreAction::Restore => {
            let results = run_restore(&state.pool, &admin, &tables, Vec::new()).await?;
            restore_response(results)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /admin/data/restore/archive
// ---------------------------------------------------------------------------

/// Restore (or preview) an uploaded export archive.
///
/// Tables whose archive entries are unreadable become failed results;
/// the remaining tables are still applied.
pub async fn restore_archive(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<RestoreArchiveQuery>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let contents = archive::read(&body)
        .map_err(|e| AppError::BadRequest(format!("Unreadable archive: {e}")))?;

    let read_failures: Vec<ApplyResult> = contents
        .errors
        .into_iter()
        .map(|e| ApplyResult::failed(e.table, e.error))
        .collect();

    match query.action {
        RestoreAction::Preview => {
            let previews = bulk::preview(&contents.tables);
            Ok(Json(DataResponse {
                data: json!({
                    "action": "preview",
                    "tables": previews,
                    "readErrors": read_failures,
                }),
            }))
        }
        RestoreAction::Restore => {
            let results =
                run_restore(&state.pool, &admin, &contents.tables, read_failures).await?;
            restore_response(results)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /admin/data/import/sql
// ---------------------------------------------------------------------------

/// Parse a SQL script's INSERT statements and preview or apply them.
///
/// Non-INSERT statements are skipped and reported; with `strict` set they
/// reject the request instead.
pub async fn import_sql(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<ImportSqlRequest>,
) -> AppResult<impl IntoResponse> {
    let (tables, skipped) = if request.strict {
        let tables = extract_inserts_strict(&request.sql_text)
            .map_err(AppError::BadRequest)?;
        (tables, Vec::new())
    } else {
        let outcome = extract_inserts(&request.sql_text);
        (outcome.tables, outcome.skipped)
    };

    if tables.is_empty() && skipped.is_empty() {
        return Err(AppError::BadRequest(
            "No INSERT statements found in the provided SQL".to_string(),
        ));
    }

    match request.action {
        RestoreAction::Preview => {
            let previews = bulk::preview(&tables);
            Ok(Json(DataResponse {
                data: json!({
                    "action": "preview",
                    "tables": previews,
                    "skippedStatements": skipped,
                }),
            }))
        }
        RestoreAction::Restore => {
            let results = run_restore(&state.pool, &admin, &tables, Vec::new()).await?;
            let summary = summarize(&results);
            let status = derive_status(&results);
            Ok(Json(DataResponse {
                data: json!({
                    "success": status == RunStatus::Completed,
                    "results": results,
                    "summary": summary,
                    "skippedStatements": skipped,
                }),
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert raw JSON rows into records, rejecting non-object rows.
fn revive_tables(
    table_data: IndexMap<String, Vec<serde_json::Value>>,
) -> AppResult<IndexMap<String, Vec<Record>>> {
    let mut tables = IndexMap::with_capacity(table_data.len());
    for (name, rows) in table_data {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = record_from_json(row).ok_or_else(|| {
                AppError::BadRequest(format!("Table {name}: every row must be a JSON object"))
            })?;
            records.push(record);
        }
        tables.insert(name, records);
    }
    Ok(tables)
}

/// Execute a restore run bracketed by history rows.
///
/// The run opens as `in_progress` before the first table is touched and
/// is closed with the derived status even when every table fails.
async fn run_restore(
    pool: &DbPool,
    admin: &AuthUser,
    tables: &IndexMap<String, Vec<Record>>,
    mut results: Vec<ApplyResult>,
) -> AppResult<Vec<ApplyResult>> {
    let run = BackupRunRepo::create(
        pool,
        &CreateBackupRun {
            run_type: RunType::Restore,
            initiated_by: admin.user_id,
            notes: None,
        },
    )
    .await?;

    results.extend(bulk::apply(pool, tables).await);

    let summary = summarize(&results);
    let status = derive_status(&results);
    let counts: IndexMap<&str, usize> = results
        .iter()
        .map(|r| (r.table.as_str(), r.records_applied))
        .collect();

    BackupRunRepo::complete(
        pool,
        run.id,
        &CompleteBackupRun {
            status,
            total_records: summary.total_records as i64,
            table_counts: serde_json::to_value(counts).unwrap_or_default(),
            notes: None,
        },
    )
    .await?;

    tracing::info!(
        user_id = admin.user_id,
        run_id = run.id,
        status = status.as_str(),
        total_records = summary.total_records,
        "restore run finished"
    );

    Ok(results)
}

fn preview_response(
    tables: &IndexMap<String, Vec<Record>>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let previews = bulk::preview(tables);
    Ok(Json(DataResponse {
        data: json!({
            "action": "preview",
            "tables": previews,
        }),
    }))
}

fn restore_response(
    results: Vec<ApplyResult>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let summary = summarize(&results);
    let status = derive_status(&results);
    Ok(Json(DataResponse {
        data: json!({
            "success": status == RunStatus::Completed,
            "results": results,
            "summary": summary,
        }),
    }))
}
