//! Bulk apply engine: insert-or-update-by-identity across many tables.
//!
//! Planning is pure and separately testable: [`plan`] orders the tables,
//! strips server-computed columns, validates names, and renders the upsert
//! batch for each table. [`apply`] then executes one batch per table,
//! sequentially in dependency order, capturing any failure as a per-table
//! [`ApplyResult`] instead of aborting the run. There is no cross-table
//! transaction and no rollback: every table's batch is its own unit, and
//! the upsert is idempotent, so re-running the same input after fixing a
//! failed table is always safe.

use indexmap::IndexMap;
use sqlx::PgPool;

use dealerdesk_core::apply::ApplyResult;
use dealerdesk_core::ordering::{generated_columns, is_safe_identifier, order_tables};
use dealerdesk_core::record::{FieldValue, Record};
use dealerdesk_core::serializer::to_statement_batch;

/// One planned unit of work: a table, its record count, and either the SQL
/// batch to execute or the reason the table can never be applied.
#[derive(Debug, Clone)]
pub struct TableStep {
    pub table: String,
    pub record_count: usize,
    /// Rendered upsert batch; `None` for empty tables and rejected names.
    pub sql: Option<String>,
    /// Set when the table is rejected before reaching the database.
    pub error: Option<String>,
}

/// Preview of one table's pending records: count plus a few sample ids.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TablePreview {
    pub table: String,
    pub record_count: usize,
    pub sample_ids: Vec<String>,
}

/// Number of sample identifiers returned per table in preview mode.
const PREVIEW_SAMPLE_IDS: usize = 3;

/// Build the execution plan for a table-to-records mapping.
///
/// Tables come out in dependency order. Empty tables produce a step with
/// no SQL (recorded as a zero-count success so run totals stay accurate).
/// Server-computed columns are stripped before rendering.
pub fn plan(tables: &IndexMap<String, Vec<Record>>) -> Vec<TableStep> {
    let present: Vec<String> = tables.keys().cloned().collect();

    order_tables(&present)
        .into_iter()
        .map(|table| {
            let records = &tables[&table];

            if records.is_empty() {
                return TableStep {
                    table,
                    record_count: 0,
                    sql: None,
                    error: None,
                };
            }

            if !is_safe_identifier(&table) {
                return TableStep {
                    record_count: records.len(),
                    sql: None,
                    error: Some(format!("'{table}' is not a safe table name")),
                    table,
                };
            }

            let stripped = strip_generated(&table, records);
            let sql = to_statement_batch(&table, &stripped);
            TableStep {
                record_count: records.len(),
                sql: Some(sql),
                error: None,
                table,
            }
        })
        .collect()
}

/// Execute a plan against a privileged pool, one table at a time.
///
/// A failing table is recorded and the remaining tables still run; the
/// result sequence is in processing order.
pub async fn apply(pool: &PgPool, tables: &IndexMap<String, Vec<Record>>) -> Vec<ApplyResult> {
    let mut results = Vec::new();

    for step in plan(tables) {
        let result = match (&step.sql, &step.error) {
            (_, Some(reason)) => ApplyResult::failed(&step.table, reason.clone()),
            (None, None) => ApplyResult::ok(&step.table, 0),
            (Some(sql), None) => match sqlx::raw_sql(sql).execute(pool).await {
                Ok(_) => ApplyResult::ok(&step.table, step.record_count),
                Err(err) => ApplyResult::failed(&step.table, err.to_string()),
            },
        };

        if result.success {
            tracing::debug!(table = %result.table, records = result.records_applied, "table applied");
        } else {
            tracing::warn!(
                table = %result.table,
                error = result.error.as_deref().unwrap_or(""),
                "table apply failed, continuing with remaining tables",
            );
        }
        results.push(result);
    }

    results
}

/// Compute per-table previews without writing anything.
pub fn preview(tables: &IndexMap<String, Vec<Record>>) -> Vec<TablePreview> {
    let present: Vec<String> = tables.keys().cloned().collect();

    order_tables(&present)
        .into_iter()
        .map(|table| {
            let records = &tables[&table];
            let sample_ids = records
                .iter()
                .filter_map(|r| match r.get("id") {
                    Some(FieldValue::Text(s)) => Some(s.clone()),
                    Some(FieldValue::Number(n)) => Some(n.to_string()),
                    _ => None,
                })
                .take(PREVIEW_SAMPLE_IDS)
                .collect();

            TablePreview {
                record_count: records.len(),
                sample_ids,
                table,
            }
        })
        .collect()
}

/// Drop server-computed columns for `table` from every record.
///
/// Exported rows carry these columns for human inspection; they must not
/// appear in re-applied upserts.
pub fn strip_generated(table: &str, records: &[Record]) -> Vec<Record> {
    let excluded = generated_columns(table);
    if excluded.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            for column in excluded {
                record.shift_remove(*column);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn table_map(entries: Vec<(&str, Vec<Record>)>) -> IndexMap<String, Vec<Record>> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn plan_orders_tables_parent_first() {
        let tables = table_map(vec![
            ("invoices", vec![record(&[("id", FieldValue::from("i1"))])]),
            ("dealers", vec![record(&[("id", FieldValue::from("d1"))])]),
            ("sales_orders", vec![record(&[("id", FieldValue::from("s1"))])]),
        ]);

        let steps = plan(&tables);
        let order: Vec<&str> = steps.iter().map(|s| s.table.as_str()).collect();
        assert_eq!(order, vec!["dealers", "sales_orders", "invoices"]);
    }

    #[test]
    fn plan_records_empty_tables_with_no_sql() {
        let tables = table_map(vec![("dealers", vec![])]);
        let steps = plan(&tables);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].record_count, 0);
        assert!(steps[0].sql.is_none());
        assert!(steps[0].error.is_none());
    }

    #[test]
    fn plan_rejects_unsafe_table_names() {
        let tables = table_map(vec![(
            "dealers; DROP TABLE x",
            vec![record(&[("id", FieldValue::from("d1"))])],
        )]);
        let steps = plan(&tables);

        assert!(steps[0].sql.is_none());
        assert!(steps[0].error.as_deref().unwrap().contains("not a safe"));
    }

    #[test]
    fn plan_strips_generated_columns() {
        let tables = table_map(vec![(
            "cash_flow_entries",
            vec![record(&[
                ("id", FieldValue::from("c1")),
                ("amount", FieldValue::from(100)),
                ("running_balance", FieldValue::from(1100)),
            ])],
        )]);
        let steps = plan(&tables);
        let sql = steps[0].sql.as_deref().unwrap();

        assert!(!sql.contains("running_balance"));
        assert!(sql.contains("amount"));
        // The count reflects source records, not the stripped shape.
        assert_eq!(steps[0].record_count, 1);
    }

    #[test]
    fn plan_failure_is_isolated_to_one_table() {
        let tables = table_map(vec![
            ("dealers", vec![record(&[("id", FieldValue::from("d1"))])]),
            ("Bad Name", vec![record(&[("id", FieldValue::from("x"))])]),
            ("invoices", vec![record(&[("id", FieldValue::from("i1"))])]),
        ]);
        let steps = plan(&tables);

        let failed: Vec<&TableStep> = steps.iter().filter(|s| s.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].table, "Bad Name");
        assert!(steps.iter().filter(|s| s.sql.is_some()).count() == 2);
    }

    #[test]
    fn plan_sql_matches_serializer_output() {
        let records = vec![record(&[
            ("id", FieldValue::from("d1")),
            ("dealer_name", FieldValue::from("Acme")),
        ])];
        let tables = table_map(vec![("dealers", records.clone())]);
        let steps = plan(&tables);

        assert_eq!(
            steps[0].sql.as_deref().unwrap(),
            to_statement_batch("dealers", &records)
        );
    }

    #[test]
    fn preview_samples_at_most_three_ids() {
        let records: Vec<Record> = (1..=5)
            .map(|i| record(&[("id", FieldValue::from(format!("d{i}").as_str()))]))
            .collect();
        let tables = table_map(vec![("dealers", records)]);

        let previews = preview(&tables);
        assert_eq!(previews[0].record_count, 5);
        assert_eq!(previews[0].sample_ids, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn preview_handles_numeric_and_missing_ids() {
        let tables = table_map(vec![(
            "payments",
            vec![
                record(&[("id", FieldValue::from(7))]),
                record(&[("amount", FieldValue::from(10))]),
            ],
        )]);

        let previews = preview(&tables);
        assert_eq!(previews[0].sample_ids, vec!["7"]);
        assert_eq!(previews[0].record_count, 2);
    }
}
