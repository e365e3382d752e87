use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; the pool is internally reference-counted and the
/// config sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Privileged database connection pool. Bulk restore must be able to
    /// write rows created by arbitrary original authors, so this pool
    /// connects as a role that bypasses row-level policies; access is
    /// gated by the admin extractor, never exposed to regular callers.
    pub pool: dealerdesk_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
