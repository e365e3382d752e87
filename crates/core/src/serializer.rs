//! Row serializer: renders a table snapshot as delimited text (CSV) or as
//! a human-auditable SQL upsert batch.
//!
//! Both functions are pure and total over well-formed input. Column names
//! are taken from the first record's key order and are not escaped; only
//! values are. A column name containing a delimiter or SQL-unsafe character
//! is a known limitation of the interchange format.

use crate::record::{FieldValue, Record};

/// Identity column used by every upsert. Rows are insert-or-update by this
/// column; it is never rewritten by the conflict clause.
pub const IDENTITY_COLUMN: &str = "id";

/// Schema prefix used in emitted statements.
pub const SCHEMA: &str = "public";

// ---------------------------------------------------------------------------
// Delimited text (CSV)
// ---------------------------------------------------------------------------

/// Render records as delimited text.
///
/// The first record's keys become the header, in that record's key order.
/// Null or absent values render as empty text; non-scalar values are
/// JSON-stringified. A field is quoted only when it contains a comma,
/// a double quote, or a newline, with internal double quotes doubled.
/// Rows are newline-joined with no trailing newline. Empty input yields
/// an empty string, not a header-only output.
pub fn to_delimited_text(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join(","));

    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|col| csv_field(record.get(*col)))
            .collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn csv_field(value: Option<&FieldValue>) -> String {
    let text = match value {
        None | Some(FieldValue::Null) => return String::new(),
        Some(FieldValue::Bool(b)) => b.to_string(),
        Some(FieldValue::Number(n)) => n.to_string(),
        Some(FieldValue::Text(s)) => s.clone(),
        Some(FieldValue::Json(v)) => v.to_string(),
    };

    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// SQL upsert batch
// ---------------------------------------------------------------------------

/// Render records as a batch of single-row upsert statements.
///
/// Emits a leading comment noting table name and record count, then one
/// `INSERT INTO public.<table> (..) VALUES (..) ON CONFLICT (id) DO UPDATE
/// SET ..;` statement per record, updating every column except the identity
/// column. A record whose only column is the identity column degrades to
/// `DO NOTHING` so the statement stays valid SQL.
///
/// Empty input yields an empty string.
pub fn to_statement_batch(table: &str, records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();

    let update_set: Vec<String> = columns
        .iter()
        .filter(|c| **c != IDENTITY_COLUMN)
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    let conflict_clause = if update_set.is_empty() {
        format!("ON CONFLICT ({IDENTITY_COLUMN}) DO NOTHING")
    } else {
        format!(
            "ON CONFLICT ({IDENTITY_COLUMN}) DO UPDATE SET {}",
            update_set.join(", ")
        )
    };

    let mut out = format!(
        "-- Data for table: {table} ({count} records)\n",
        count = records.len()
    );
    for record in records {
        let values: Vec<String> = columns
            .iter()
            .map(|col| sql_literal(record.get(*col)))
            .collect();
        out.push_str(&format!(
            "INSERT INTO {SCHEMA}.{table} ({cols}) VALUES ({vals}) {conflict_clause};\n",
            cols = columns.join(", "),
            vals = values.join(", "),
        ));
    }
    out
}

/// Render a single value as a SQL literal.
///
/// Absent values render as `NULL`; strings and JSON are single-quoted with
/// internal single quotes doubled.
pub fn sql_literal(value: Option<&FieldValue>) -> String {
    match value {
        None | Some(FieldValue::Null) => "NULL".to_string(),
        Some(FieldValue::Bool(true)) => "TRUE".to_string(),
        Some(FieldValue::Bool(false)) => "FALSE".to_string(),
        Some(FieldValue::Number(n)) => n.to_string(),
        Some(FieldValue::Text(s)) => quote(s),
        Some(FieldValue::Json(v)) => quote(&v.to_string()),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // -- to_delimited_text ----------------------------------------------------

    #[test]
    fn csv_empty_input_is_empty() {
        assert_eq!(to_delimited_text(&[]), "");
    }

    #[test]
    fn csv_null_and_embedded_comma() {
        let records = vec![
            record(&[("a", FieldValue::from(1)), ("b", FieldValue::Null)]),
            record(&[("a", FieldValue::from(2)), ("b", FieldValue::from("x,y"))]),
        ];
        assert_eq!(to_delimited_text(&records), "a,b\n1,\n2,\"x,y\"");
    }

    #[test]
    fn csv_quotes_are_doubled() {
        let records = vec![record(&[("name", FieldValue::from("say \"hi\""))])];
        assert_eq!(to_delimited_text(&records), "name\n\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_newline_forces_quoting() {
        let records = vec![record(&[("note", FieldValue::from("line1\nline2"))])];
        assert_eq!(to_delimited_text(&records), "note\n\"line1\nline2\"");
    }

    #[test]
    fn csv_json_values_are_stringified() {
        let records = vec![record(&[(
            "meta",
            FieldValue::Json(serde_json::json!({"k": 1})),
        )])];
        // The JSON text contains a quote, so the field is quoted and doubled.
        assert_eq!(to_delimited_text(&records), "meta\n\"{\"\"k\"\":1}\"");
    }

    #[test]
    fn csv_absent_key_renders_empty() {
        let records = vec![
            record(&[("a", FieldValue::from(1)), ("b", FieldValue::from(2))]),
            record(&[("a", FieldValue::from(3))]),
        ];
        assert_eq!(to_delimited_text(&records), "a,b\n1,2\n3,");
    }

    #[test]
    fn csv_booleans_render_lowercase() {
        let records = vec![record(&[("active", FieldValue::from(true))])];
        assert_eq!(to_delimited_text(&records), "active\ntrue");
    }

    // -- to_statement_batch ---------------------------------------------------

    #[test]
    fn batch_empty_input_is_empty() {
        assert_eq!(to_statement_batch("dealers", &[]), "");
    }

    #[test]
    fn batch_single_record_shape() {
        let records = vec![record(&[
            ("id", FieldValue::from("d1")),
            ("dealer_name", FieldValue::from("Acme")),
        ])];
        let sql = to_statement_batch("dealers", &records);
        assert_eq!(
            sql,
            "-- Data for table: dealers (1 records)\n\
             INSERT INTO public.dealers (id, dealer_name) VALUES ('d1', 'Acme') \
             ON CONFLICT (id) DO UPDATE SET dealer_name = EXCLUDED.dealer_name;\n"
        );
    }

    #[test]
    fn batch_escapes_single_quotes() {
        let records = vec![record(&[
            ("id", FieldValue::from("d1")),
            ("dealer_name", FieldValue::from("O'Brien, Inc.")),
        ])];
        let sql = to_statement_batch("dealers", &records);
        assert!(sql.contains("'O''Brien, Inc.'"));
    }

    #[test]
    fn batch_null_bool_number_literals() {
        let records = vec![record(&[
            ("id", FieldValue::from("p1")),
            ("qty", FieldValue::from(7)),
            ("active", FieldValue::from(false)),
            ("notes", FieldValue::Null),
        ])];
        let sql = to_statement_batch("products", &records);
        assert!(sql.contains("VALUES ('p1', 7, FALSE, NULL)"));
    }

    #[test]
    fn batch_json_is_quoted_text() {
        let records = vec![record(&[
            ("id", FieldValue::from("i1")),
            ("line_items", FieldValue::Json(serde_json::json!(["a", "b"]))),
        ])];
        let sql = to_statement_batch("invoices", &records);
        assert!(sql.contains(r#"'["a","b"]'"#));
    }

    #[test]
    fn batch_identity_only_record_uses_do_nothing() {
        let records = vec![record(&[("id", FieldValue::from("x"))])];
        let sql = to_statement_batch("tags", &records);
        assert!(sql.contains("ON CONFLICT (id) DO NOTHING;"));
        assert!(!sql.contains("DO UPDATE"));
    }

    #[test]
    fn batch_identity_column_not_in_update_set() {
        let records = vec![record(&[
            ("id", FieldValue::from("d1")),
            ("a", FieldValue::from(1)),
            ("b", FieldValue::from(2)),
        ])];
        let sql = to_statement_batch("dealers", &records);
        assert!(sql.contains("DO UPDATE SET a = EXCLUDED.a, b = EXCLUDED.b;"));
        assert!(!sql.contains("id = EXCLUDED.id"));
    }
}
