//! Route definitions for the `/admin/data` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{backup, export, restore};
use crate::state::AppState;

/// Routes mounted at `/admin/data`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// POST /export/archive   -> export_archive (zip attachment)
/// POST /export/sql       -> export_sql (sql attachment)
/// POST /restore          -> restore (JSON table data)
/// POST /restore/archive  -> restore_archive (zip body, ?action=)
/// POST /import/sql       -> import_sql
/// POST /backup           -> trigger_backup
/// GET  /history          -> list_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export/archive", post(export::export_archive))
        .route("/export/sql", post(export::export_sql))
        .route("/restore", post(restore::restore))
        .route("/restore/archive", post(restore::restore_archive))
        .route("/import/sql", post(restore::import_sql))
        .route("/backup", post(backup::trigger_backup))
        .route("/history", get(backup::list_history))
}
