pub mod data;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /admin/data/export/archive    full export as zip archive (POST)
/// /admin/data/export/sql        full or filtered export as SQL script (POST)
/// /admin/data/restore           restore from JSON table data (POST)
/// /admin/data/restore/archive   restore from an uploaded archive (POST)
/// /admin/data/import/sql        import INSERT statements from SQL (POST)
/// /admin/data/backup            record a backup run (POST)
/// /admin/data/history           list past runs (GET)
/// ```
///
/// Health check routes live at the root level, outside this tree.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/admin/data", data::router())
}
