//! Database layer: pool construction, migrations, and the repositories and
//! bulk engine behind the data-management endpoints.
//!
//! All queries are runtime-checked (`query_as` / `query_scalar`), so the
//! crate builds without a live database. The pool is created once per
//! process and passed down explicitly; no module-level handles.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod bulk;
pub mod models;
pub mod repositories;

/// Shared connection pool type used across the workspace.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool against the given database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Verify the database responds to a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply embedded migrations (the `backup_runs` audit table).
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
