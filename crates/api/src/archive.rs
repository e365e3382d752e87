//! The export archive container: one zip with `<table>.csv` and
//! `<table>.json` entries per non-empty table snapshot plus a
//! `_export_summary.json` manifest.
//!
//! Built and consumed entirely in memory; the archive never lives on this
//! server beyond the request that produces or receives it. Zero-record
//! tables are omitted on build and read back as empty snapshots, not as
//! errors. Malformed JSON in a present entry is a per-table error carried
//! in the result, never a whole-archive failure.

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use dealerdesk_core::ordering::TABLE_ORDER;
use dealerdesk_core::record::{record_from_json, record_to_json, Record};
use dealerdesk_core::serializer::to_delimited_text;
use dealerdesk_core::types::Timestamp;

/// Manifest entry name inside every archive.
pub const SUMMARY_ENTRY: &str = "_export_summary.json";

/// The `_export_summary.json` manifest. Field names are camelCase on the
/// wire; that is the interchange contract, not a serde default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub export_date: Timestamp,
    pub tables_exported: usize,
    pub record_counts: IndexMap<String, usize>,
    pub total_records: usize,
}

/// A table whose `.json` entry was present but unreadable.
#[derive(Debug, Clone, Serialize)]
pub struct TableReadError {
    pub table: String,
    pub error: String,
}

/// Everything recovered from an uploaded archive.
#[derive(Debug, Default)]
pub struct ArchiveContents {
    /// Records per table. Tables without an archive entry map to an empty
    /// list; tables whose entry failed to read are absent here and appear
    /// only in `errors`, so each table surfaces exactly once downstream.
    pub tables: IndexMap<String, Vec<Record>>,
    /// Per-table read failures (malformed JSON, unreadable entry).
    pub errors: Vec<TableReadError>,
}

/// Container-level failures (corrupt zip, I/O). Per-table problems are
/// data, not errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive error: {0}")]
    Zip(#[from] ZipError),
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build an archive from table snapshots.
///
/// Snapshots with zero records are omitted entirely. Deterministic given
/// deterministic input order, except for the manifest timestamp.
pub fn build(snapshots: &[(String, Vec<Record>)]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut record_counts: IndexMap<String, usize> = IndexMap::new();

    for (name, records) in snapshots {
        if records.is_empty() {
            continue;
        }

        writer.start_file(format!("{name}.csv"), options)?;
        writer.write_all(to_delimited_text(records).as_bytes())?;

        let json_rows: Vec<serde_json::Value> = records.iter().map(record_to_json).collect();
        writer.start_file(format!("{name}.json"), options)?;
        writer.write_all(serde_json::to_string_pretty(&json_rows)?.as_bytes())?;

        record_counts.insert(name.clone(), records.len());
    }

    let summary = ExportSummary {
        export_date: Utc::now(),
        tables_exported: record_counts.len(),
        total_records: record_counts.values().sum(),
        record_counts,
    };
    writer.start_file(SUMMARY_ENTRY, options)?;
    writer.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;

    Ok(writer.finish()?.into_inner())
}

/// Unpack an archive into per-table record lists.
///
/// Reads every table known to the dependency order plus any extra `.json`
/// entries actually present, in that order.
pub fn read(bytes: &[u8]) -> Result<ArchiveContents, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut names: Vec<String> = TABLE_ORDER.iter().map(|t| t.to_string()).collect();
    let extra: Vec<String> = archive
        .file_names()
        .filter(|n| n.ends_with(".json") && *n != SUMMARY_ENTRY)
        .map(|n| n.trim_end_matches(".json").to_string())
        .collect();
    for name in extra {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut contents = ArchiveContents::default();

    for name in names {
        match archive.by_name(&format!("{name}.json")) {
            Err(ZipError::FileNotFound) => {
                // Omitted on export means the table had zero records.
                contents.tables.insert(name, Vec::new());
            }
            Err(err) => {
                contents.errors.push(TableReadError {
                    table: name,
                    error: err.to_string(),
                });
            }
            Ok(mut entry) => {
                let mut text = String::new();
                if let Err(err) = entry.read_to_string(&mut text) {
                    drop(entry);
                    contents.errors.push(TableReadError {
                        table: name,
                        error: err.to_string(),
                    });
                    continue;
                }
                drop(entry);

                match parse_table_entry(&text) {
                    Ok(records) => {
                        contents.tables.insert(name, records);
                    }
                    Err(err) => {
                        contents.errors.push(TableReadError { table: name, error: err });
                    }
                }
            }
        }
    }

    Ok(contents)
}

/// Read just the manifest, if present.
pub fn read_summary(bytes: &[u8]) -> Result<Option<ExportSummary>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let result = match archive.by_name(SUMMARY_ENTRY) {
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
        Ok(mut entry) => {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            Ok(Some(serde_json::from_str(&text)?))
        }
    };
    result
}

fn parse_table_entry(text: &str) -> Result<Vec<Record>, String> {
    let rows: Vec<serde_json::Value> =
        serde_json::from_str(text).map_err(|e| format!("malformed JSON entry: {e}"))?;

    rows.into_iter()
        .map(|row| record_from_json(row).ok_or_else(|| "entry row is not a JSON object".to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerdesk_core::record::FieldValue;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn dealer_snapshot() -> Vec<Record> {
        vec![
            record(&[
                ("id", FieldValue::from("d1")),
                ("dealer_name", FieldValue::from("Acme, Inc.")),
                ("credit_limit", FieldValue::from(50_000)),
            ]),
            record(&[
                ("id", FieldValue::from("d2")),
                ("dealer_name", FieldValue::from("O'Brien")),
                ("credit_limit", FieldValue::Null),
            ]),
        ]
    }

    #[test]
    fn build_read_round_trip() {
        let payments = vec![record(&[
            ("id", FieldValue::from("p1")),
            ("meta", FieldValue::Json(serde_json::json!({"method": "cash"}))),
        ])];
        let snapshots = vec![
            ("dealers".to_string(), dealer_snapshot()),
            ("payments".to_string(), payments.clone()),
        ];

        let bytes = build(&snapshots).unwrap();
        let contents = read(&bytes).unwrap();

        assert!(contents.errors.is_empty());
        assert_eq!(contents.tables["dealers"], dealer_snapshot());
        assert_eq!(contents.tables["payments"], payments);
    }

    #[test]
    fn empty_snapshot_is_omitted_and_reads_back_empty() {
        let snapshots = vec![
            ("dealers".to_string(), dealer_snapshot()),
            ("invoices".to_string(), Vec::new()),
        ];

        let bytes = build(&snapshots).unwrap();

        // No entries were written for the empty table.
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let entry_names: Vec<&str> = archive.file_names().collect();
        assert!(!entry_names.contains(&"invoices.json"));
        assert!(!entry_names.contains(&"invoices.csv"));

        let contents = read(&bytes).unwrap();
        assert!(contents.errors.is_empty());
        assert!(contents.tables["invoices"].is_empty());
    }

    #[test]
    fn manifest_counts_match_snapshots() {
        let snapshots = vec![("dealers".to_string(), dealer_snapshot())];
        let bytes = build(&snapshots).unwrap();

        let summary = read_summary(&bytes).unwrap().unwrap();
        assert_eq!(summary.tables_exported, 1);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.record_counts["dealers"], 2);
    }

    #[test]
    fn manifest_uses_camel_case_keys() {
        let bytes = build(&[("dealers".to_string(), dealer_snapshot())]).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut text = String::new();
        archive
            .by_name(SUMMARY_ENTRY)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();

        assert!(text.contains("\"exportDate\""));
        assert!(text.contains("\"recordCounts\""));
        assert!(text.contains("\"totalRecords\""));
    }

    #[test]
    fn malformed_entry_is_a_per_table_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("dealers.json", options).unwrap();
        writer.write_all(b"{ not json").unwrap();
        writer.start_file("payments.json", options).unwrap();
        writer
            .write_all(br#"[{"id": "p1", "amount": 10}]"#)
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let contents = read(&bytes).unwrap();

        assert_eq!(contents.errors.len(), 1);
        assert_eq!(contents.errors[0].table, "dealers");
        assert!(contents.errors[0].error.contains("malformed JSON"));
        // The broken table is reported once, through errors only; the good
        // one still parses.
        assert!(!contents.tables.contains_key("dealers"));
        assert_eq!(contents.tables["payments"].len(), 1);
    }

    #[test]
    fn unknown_table_entries_are_included_after_known_ones() {
        let snapshots = vec![(
            "custom_notes".to_string(),
            vec![record(&[("id", FieldValue::from("n1"))])],
        )];
        let bytes = build(&snapshots).unwrap();
        let contents = read(&bytes).unwrap();

        assert_eq!(contents.tables["custom_notes"].len(), 1);
        let last = contents.tables.keys().last().unwrap();
        assert_eq!(last, "custom_notes");
    }

    #[test]
    fn csv_entry_matches_serializer_output() {
        let bytes = build(&[("dealers".to_string(), dealer_snapshot())]).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut text = String::new();
        archive
            .by_name("dealers.csv")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();

        assert_eq!(text, to_delimited_text(&dealer_snapshot()));
        assert!(text.starts_with("id,dealer_name,credit_limit"));
        assert!(text.contains("\"Acme, Inc.\""));
    }
}
