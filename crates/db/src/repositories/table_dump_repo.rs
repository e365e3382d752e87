//! Generic whole-table reads used by export and backup accounting.
//!
//! Table names are interpolated into SQL text, so callers must only pass
//! names validated with [`dealerdesk_core::ordering::is_safe_identifier`]
//! (the handlers iterate the static `TABLE_ORDER` constant, which is safe
//! by construction).

use sqlx::PgPool;

use dealerdesk_core::ordering::is_safe_identifier;
use dealerdesk_core::record::{record_from_json, Record};

/// Generic table dump and row-count queries.
pub struct TableDumpRepo;

impl TableDumpRepo {
    /// Fetch every row of `table` as a schemaless record.
    ///
    /// Rows come back as `to_jsonb` objects ordered by `id` so exports are
    /// deterministic.
    pub async fn fetch_all(pool: &PgPool, table: &str) -> Result<Vec<Record>, sqlx::Error> {
        debug_assert!(is_safe_identifier(table), "unvalidated table name: {table}");

        let query = format!("SELECT to_jsonb(t) FROM \"{table}\" t ORDER BY t.id");
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&query).fetch_all(pool).await?;

        Ok(rows.into_iter().filter_map(record_from_json).collect())
    }

    /// Count the rows of `table` without reading any contents.
    pub async fn count(pool: &PgPool, table: &str) -> Result<i64, sqlx::Error> {
        debug_assert!(is_safe_identifier(table), "unvalidated table name: {table}");

        let query = format!("SELECT count(*) FROM \"{table}\"");
        sqlx::query_scalar(&query).fetch_one(pool).await
    }
}
