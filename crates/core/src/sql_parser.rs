//! Streaming parser for the SQL dump interchange format.
//!
//! Extracts `INSERT INTO <table> (cols) VALUES (..)` statements from a
//! free-form text blob and turns each into a table name plus a
//! column-to-value record. The parser is intentionally conservative: it
//! handles exactly the statement shape the row serializer emits
//! (single-row inserts, optional trailing `ON CONFLICT` clause, scalar or
//! quoted-JSON values) and fails closed on anything else.
//!
//! Discarded input is never silent: every statement the parser drops is
//! returned as a [`SkippedStatement`] with its line range and reason, and
//! [`extract_inserts_strict`] turns any skip into a top-level error.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::record::{FieldValue, Record};

/// A statement the parser dropped, with the physical lines it spanned.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedStatement {
    /// First physical line of the statement (1-based).
    pub line_start: usize,
    /// Last physical line of the statement (1-based).
    pub line_end: usize,
    /// Why the statement was dropped.
    pub reason: String,
}

/// Result of parsing a dump: records grouped by table, plus every skip.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Parsed records keyed by table name, in encounter order.
    pub tables: IndexMap<String, Vec<Record>>,
    /// Statements that produced no record, with reasons.
    pub skipped: Vec<SkippedStatement>,
}

impl ParseOutcome {
    /// Total record count across all tables.
    pub fn total_records(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Extract all parseable `INSERT` statements from `text` (lenient mode).
///
/// Blank lines, `--` comment lines, and administrative statements
/// (`SET ..`, `BEGIN;`, `COMMIT;`) between statements never contribute to
/// output and are not reported. Consecutive physical lines accumulate into
/// one logical statement until a line ends with `;`; while a statement is
/// accumulating every physical line is kept verbatim, so a quoted value
/// spanning lines keeps its embedded newlines, blank lines, and lines that
/// merely look like comments.
pub fn extract_inserts(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut buffer: Vec<&str> = Vec::new();
    let mut start_line = 0usize;
    let mut end_line = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if buffer.is_empty() {
            if line.is_empty() || line.starts_with("--") || is_administrative(line) {
                continue;
            }
            start_line = line_no;
        }
        end_line = line_no;
        buffer.push(raw);

        if line.ends_with(';') {
            let statement = buffer.join("\n");
            buffer.clear();
            consume_statement(&statement, start_line, end_line, &mut outcome);
        }
    }

    if !buffer.is_empty() {
        outcome.skipped.push(SkippedStatement {
            line_start: start_line,
            line_end: end_line,
            reason: "statement not terminated with ';'".to_string(),
        });
    }

    outcome
}

/// Strict-mode extraction: any skipped statement fails the whole parse.
pub fn extract_inserts_strict(text: &str) -> Result<IndexMap<String, Vec<Record>>, String> {
    let outcome = extract_inserts(text);
    if let Some(skip) = outcome.skipped.first() {
        return Err(format!(
            "{} statement(s) could not be parsed; first at lines {}-{}: {}",
            outcome.skipped.len(),
            skip.line_start,
            skip.line_end,
            skip.reason
        ));
    }
    Ok(outcome.tables)
}

fn is_administrative(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    upper.starts_with("SET ") || upper == "BEGIN;" || upper == "COMMIT;"
}

fn consume_statement(statement: &str, line_start: usize, line_end: usize, out: &mut ParseOutcome) {
    if !statement.to_ascii_uppercase().contains("INSERT INTO") {
        out.skipped.push(SkippedStatement {
            line_start,
            line_end,
            reason: "statement is not an INSERT".to_string(),
        });
        return;
    }

    match parse_insert(statement) {
        Ok((table, record)) => {
            out.tables.entry(table).or_default().push(record);
        }
        Err(reason) => out.skipped.push(SkippedStatement {
            line_start,
            line_end,
            reason,
        }),
    }
}

/// Shape of a single-row insert, after the conflict clause is stripped.
/// Captures: optional schema (ignored), table, column list, value list.
fn insert_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)^\s*INSERT\s+INTO\s+(?:(\w+)\.)?(\w+)\s*\(([^)]+)\)\s*VALUES\s*\((.*)\)\s*;?\s*$",
        )
        .expect("insert statement regex must compile")
    })
}

fn parse_insert(statement: &str) -> Result<(String, Record), String> {
    let stripped = strip_conflict_clause(statement);

    let caps = insert_regex()
        .captures(&stripped)
        .ok_or_else(|| "statement does not match the single-row INSERT shape".to_string())?;

    let table = caps[2].to_string();
    let columns: Vec<String> = caps[3].split(',').map(|c| c.trim().to_string()).collect();
    let values = tokenize_values(&caps[4]);

    if columns.len() != values.len() {
        return Err(format!(
            "column count ({}) does not match value count ({})",
            columns.len(),
            values.len()
        ));
    }

    let record: Record = columns
        .into_iter()
        .zip(values.iter().map(|v| interpret_literal(v)))
        .collect();

    Ok((table, record))
}

/// Cut everything from the first top-level `ON CONFLICT` onward.
/// The clause is trailing decoration as far as row extraction goes.
///
/// The scan tracks string-literal state the same way `tokenize_values`
/// does, so the phrase occurring inside a quoted value is left alone.
fn strip_conflict_clause(statement: &str) -> String {
    const MARKER: &str = " ON CONFLICT";
    let mut in_string = false;
    let mut chars = statement.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if in_string {
            if c == '\'' {
                if chars.peek().map(|&(_, next)| next) == Some('\'') {
                    chars.next();
                } else {
                    in_string = false;
                }
            }
        } else if c == '\'' {
            in_string = true;
        } else if let Some(window) = statement.get(idx..idx + MARKER.len()) {
            if window.eq_ignore_ascii_case(MARKER) {
                return statement[..idx].to_string();
            }
        }
    }

    statement.to_string()
}

/// Split a value list on top-level commas.
///
/// Walks the text character by character keeping an inside-string flag and
/// a parenthesis depth counter. `''` inside an open string literal is a
/// literal escaped quote, not a terminator; commas inside string literals
/// or nested parentheses never split.
fn tokenize_values(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_string = false;
    let mut depth: i32 = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    buf.push_str("''");
                    chars.next();
                } else {
                    in_string = false;
                    buf.push('\'');
                }
            } else {
                buf.push(c);
            }
            continue;
        }

        match c {
            '\'' => {
                in_string = true;
                buf.push(c);
            }
            '(' => {
                depth += 1;
                buf.push(c);
            }
            ')' => {
                depth -= 1;
                buf.push(c);
            }
            ',' if depth == 0 => {
                tokens.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(c),
        }
    }

    let last = buf.trim();
    if !last.is_empty() {
        tokens.push(last.to_string());
    }

    tokens
}

/// Interpret a single value token as a field value.
///
/// `NULL`/`TRUE`/`FALSE` are case-insensitive; a fully quoted token
/// becomes text with doubled quotes collapsed (revived as JSON when the
/// inner text parses as an object or array, since JSON payloads travel as
/// quoted text in this format); numeric tokens become numbers; anything
/// else is kept as raw trimmed text.
fn interpret_literal(token: &str) -> FieldValue {
    let t = token.trim();

    if t.eq_ignore_ascii_case("NULL") {
        return FieldValue::Null;
    }
    if t.eq_ignore_ascii_case("TRUE") {
        return FieldValue::Bool(true);
    }
    if t.eq_ignore_ascii_case("FALSE") {
        return FieldValue::Bool(false);
    }

    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') {
        let inner = t[1..t.len() - 1].replace("''", "'");
        if (inner.starts_with('{') && inner.ends_with('}'))
            || (inner.starts_with('[') && inner.ends_with(']'))
        {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&inner) {
                if value.is_object() || value.is_array() {
                    return FieldValue::Json(value);
                }
            }
        }
        return FieldValue::Text(inner);
    }

    if let Ok(i) = t.parse::<i64>() {
        return FieldValue::Number(i.into());
    }
    if let Ok(f) = t.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return FieldValue::Number(n);
        }
    }

    FieldValue::Text(t.to_string())
}
