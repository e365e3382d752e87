//! The schemaless record model shared by every bulk operation.
//!
//! A [`Record`] is one row's worth of column-name-to-value data. Records are
//! deliberately untyped at this layer: the subsystem trusts the source
//! (a database row dump, or a parsed SQL statement) and the destination
//! (an upsert against a typed table) to reject invalid data. Values are a
//! small closed sum so every consumer pattern-matches explicitly instead of
//! coercing at runtime.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single column value.
///
/// Serializes untagged, so a `Record` round-trips through plain JSON:
/// `Null` is `null`, `Json` covers arrays and objects, everything else is
/// the obvious scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Json(serde_json::Value),
}

/// One row: an ordered mapping from column name to value.
///
/// Key order is preserved because it drives CSV headers and SQL column
/// lists. Within a table snapshot every record *should* share the same
/// keys, but nothing here enforces that; serializers treat missing keys
/// as absent.
pub type Record = IndexMap<String, FieldValue>;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a raw JSON value into a field value.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => FieldValue::Number(n),
            serde_json::Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Json(other),
        }
    }

    /// Convert back into a raw JSON value.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(b),
            FieldValue::Number(n) => serde_json::Value::Number(n),
            FieldValue::Text(s) => serde_json::Value::String(s),
            FieldValue::Json(v) => v,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Build a [`Record`] from a JSON object, preserving the object's key order.
///
/// Returns `None` if `value` is not a JSON object.
pub fn record_from_json(value: serde_json::Value) -> Option<Record> {
    match value {
        serde_json::Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, FieldValue::from_json(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Convert a [`Record`] into a JSON object value.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = record
        .iter()
        .map(|(k, v)| (k.clone(), v.clone().into_json()))
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_covers_all_variants() {
        assert_eq!(FieldValue::from_json(serde_json::json!(null)), FieldValue::Null);
        assert_eq!(
            FieldValue::from_json(serde_json::json!(true)),
            FieldValue::Bool(true)
        );
        assert_eq!(
            FieldValue::from_json(serde_json::json!(42)),
            FieldValue::Number(42.into())
        );
        assert_eq!(
            FieldValue::from_json(serde_json::json!("x")),
            FieldValue::Text("x".to_string())
        );
        assert_eq!(
            FieldValue::from_json(serde_json::json!({"a": 1})),
            FieldValue::Json(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn json_round_trip_preserves_value() {
        let values = [
            serde_json::json!(null),
            serde_json::json!(false),
            serde_json::json!(3.5),
            serde_json::json!("text"),
            serde_json::json!([1, 2, 3]),
        ];
        for v in values {
            assert_eq!(FieldValue::from_json(v.clone()).into_json(), v);
        }
    }

    #[test]
    fn untagged_serde_round_trip() {
        let record: Record = [
            ("id".to_string(), FieldValue::from("d1")),
            ("active".to_string(), FieldValue::from(true)),
            ("notes".to_string(), FieldValue::Null),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn record_from_json_rejects_non_objects() {
        assert!(record_from_json(serde_json::json!([1, 2])).is_none());
        assert!(record_from_json(serde_json::json!("s")).is_none());
    }
}
