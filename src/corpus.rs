//! Corpus ingestion from `.csv`, `.json`, `.jsonl` and `.txt` files.
//!
//! Source columns are normalized onto the three fields the pipeline reads
//! (`text`, `timestamp`, `author`); every other column passes through as
//! post metadata, renamed with a `meta_` prefix when it would shadow a field
//! the pipeline writes. Rows without text are dropped, and the loaded corpus
//! is sorted chronologically with each post remembering its source row.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{Corpus, Post, AUTHOR_FIELD, TEXT_FIELD, TIMESTAMP_FIELD};
use crate::ScopeError;

/// Source column names accepted for the post text, in priority order. A row
/// whose preferred cell is empty falls back to the next present column.
pub const TEXT_ALIASES: &[&str] = &[
    "Tweet",
    "text",
    "post_body_text",
    "embedded",
    "EmbeddedContentText",
    "content",
    "body",
];
/// Source column names accepted for the timestamp, in priority order.
pub const TIMESTAMP_ALIASES: &[&str] = &[
    "Datetime",
    "timestamp",
    "date",
    "Date",
    "published_at",
    "created_at",
];
/// Source column names accepted for the author, in priority order.
pub const AUTHOR_ALIASES: &[&str] = &["author", "Author", "username", "user"];

/// Names written by ingestion or tracing; passthrough columns may not reuse them.
pub const RESERVED_FIELDS: &[&str] = &[
    TEXT_FIELD,
    TIMESTAMP_FIELD,
    AUTHOR_FIELD,
    "source_row",
    "index",
    "similarity",
];

const PASSTHROUGH_PREFIX: &str = "meta_";

const NULL_MARKERS: &[&str] = &["nan", "null", "none", "na", "n/a", "nat"];

/// Load a corpus, choosing the reader by file extension.
pub fn load_corpus(path: &Path) -> Result<Corpus, ScopeError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = std::fs::read(path).map_err(|e| {
        ScopeError::Ingestion(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    // Undecodable bytes are replaced rather than rejected.
    let content = String::from_utf8_lossy(&bytes);

    let corpus = match extension.as_str() {
        "csv" => parse_csv(&content)?,
        "json" => parse_json(&content)?,
        "jsonl" | "ndjson" => parse_jsonl(&content)?,
        "txt" => parse_txt(&content),
        other => {
            return Err(ScopeError::Ingestion(format!(
                "Unsupported file format '{}' for '{}'. Expected .csv, .json, .jsonl or .txt",
                other,
                path.display()
            )))
        }
    };

    info!(
        "Loaded {} posts from {} (fields: {})",
        corpus.len(),
        path.display(),
        corpus
            .fields()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(corpus)
}

/// Parse CSV with a header row.
pub fn parse_csv(content: &str) -> Result<Corpus, ScopeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ScopeError::Ingestion(
            "CSV file is empty or has no header row".to_string(),
        ));
    }
    let mapping = ColumnMapping::resolve(headers.iter().map(String::as_str))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.clone(), csv_cell(cell)))
            .collect();
        rows.push(row);
    }
    Ok(build_corpus(&mapping, rows))
}

/// Parse a JSON array of objects.
pub fn parse_json(content: &str) -> Result<Corpus, ScopeError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ScopeError::Ingestion(format!("Invalid JSON corpus: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(ScopeError::Ingestion(
            "JSON corpus must be an array of records".to_string(),
        ));
    };
    let rows = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(ScopeError::Ingestion(format!(
                "JSON corpus record {} is not an object",
                i
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    records_to_corpus(rows)
}

/// Parse newline-delimited JSON objects; blank lines are ignored.
pub fn parse_jsonl(content: &str) -> Result<Corpus, ScopeError> {
    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => rows.push(map),
            Ok(_) => {
                return Err(ScopeError::Ingestion(format!(
                    "JSONL line {} is not an object",
                    line_no + 1
                )))
            }
            Err(e) => {
                return Err(ScopeError::Ingestion(format!(
                    "Invalid JSON on line {}: {}",
                    line_no + 1,
                    e
                )))
            }
        }
    }
    records_to_corpus(rows)
}

/// The whole file becomes a single undated post.
pub fn parse_txt(content: &str) -> Corpus {
    let text = content.trim();
    let posts = if text.is_empty() {
        vec![]
    } else {
        let mut post = Post::new(text);
        post.source_row = Some(0);
        vec![post]
    };
    Corpus::with_fields(posts, [TEXT_FIELD])
}

fn records_to_corpus(rows: Vec<Map<String, Value>>) -> Result<Corpus, ScopeError> {
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    let mapping = ColumnMapping::resolve(columns.iter().map(String::as_str))?;
    Ok(build_corpus(&mapping, rows))
}

/// Which source column feeds each normalized field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMapping {
    /// Present text columns, most preferred first.
    text: Vec<String>,
    timestamp: Option<String>,
    author: Option<String>,
    /// `(source column, metadata key)` pairs.
    passthrough: Vec<(String, String)>,
}

impl ColumnMapping {
    fn resolve<'a>(columns: impl Iterator<Item = &'a str>) -> Result<Self, ScopeError> {
        let columns: Vec<&str> = columns.collect();
        let pick = |aliases: &[&str]| {
            aliases
                .iter()
                .find(|alias| columns.contains(*alias))
                .map(|alias| alias.to_string())
        };

        let text: Vec<String> = TEXT_ALIASES
            .iter()
            .filter(|alias| columns.contains(*alias))
            .map(|alias| alias.to_string())
            .collect();
        if text.is_empty() {
            return Err(ScopeError::missing_field(TEXT_FIELD));
        }
        let timestamp = pick(TIMESTAMP_ALIASES);
        let author = pick(AUTHOR_ALIASES);

        let mut taken: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let mut passthrough = Vec::new();
        for column in &columns {
            let consumed = text.iter().any(|t| t == column)
                || timestamp.as_deref() == Some(*column)
                || author.as_deref() == Some(*column);
            if consumed || column.trim().is_empty() {
                continue;
            }
            let key = if RESERVED_FIELDS.contains(column) {
                let mut key = format!("{}{}", PASSTHROUGH_PREFIX, column);
                while taken.contains(&key) {
                    key.insert_str(0, PASSTHROUGH_PREFIX);
                }
                debug!(column = %column, key = %key, "renaming reserved passthrough column");
                taken.push(key.clone());
                key
            } else {
                column.to_string()
            };
            passthrough.push((column.to_string(), key));
        }

        Ok(Self {
            text,
            timestamp,
            author,
            passthrough,
        })
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![TEXT_FIELD.to_string()];
        if self.timestamp.is_some() {
            fields.push(TIMESTAMP_FIELD.to_string());
        }
        if self.author.is_some() {
            fields.push(AUTHOR_FIELD.to_string());
        }
        fields.extend(self.passthrough.iter().map(|(_, key)| key.clone()));
        fields
    }
}

fn cell_text(value: Value) -> Option<String> {
    let text = match null_if_blank(value) {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn build_corpus(mapping: &ColumnMapping, rows: Vec<Map<String, Value>>) -> Corpus {
    let mut posts = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    let mut bad_timestamps = 0usize;

    for (row_index, mut row) in rows.into_iter().enumerate() {
        let text = mapping
            .text
            .iter()
            .filter_map(|column| row.remove(column))
            .find_map(cell_text);
        let Some(text) = text else {
            debug!(row = row_index, "dropping row without text");
            dropped += 1;
            continue;
        };

        let mut post = Post::new(text);
        post.source_row = Some(row_index);

        if let Some(column) = &mapping.timestamp {
            match row.remove(column).map(null_if_blank) {
                Some(Value::Null) | None => {}
                Some(value) => match timestamp_from_value(&value) {
                    Some(ts) => post.timestamp = Some(ts),
                    None => {
                        debug!(row = row_index, value = %value, "unparseable timestamp");
                        bad_timestamps += 1;
                    }
                },
            }
        }

        if let Some(column) = &mapping.author {
            match row.remove(column).map(null_if_blank) {
                Some(Value::String(s)) => post.author = Some(s),
                Some(Value::Null) | None => {}
                Some(other) => post.author = Some(other.to_string()),
            }
        }

        for (column, key) in &mapping.passthrough {
            if let Some(value) = row.remove(column) {
                post.metadata.insert(key.clone(), null_if_blank(value));
            }
        }

        posts.push(post);
    }

    if dropped > 0 {
        info!("Dropped {} rows without text", dropped);
    }
    if bad_timestamps > 0 {
        warn!(
            "{} timestamps could not be parsed and were left empty",
            bad_timestamps
        );
    }

    let mut corpus = Corpus::with_fields(posts, mapping.fields());
    corpus.sort_chronologically();
    corpus
}

/// CSV cells are untyped; integers and finite floats become JSON numbers.
fn csv_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if is_null_marker(trimmed) {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && trimmed.contains('.') {
            return Value::from(f);
        }
    }
    Value::String(cell.to_string())
}

fn is_null_marker(s: &str) -> bool {
    s.is_empty() || NULL_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

fn null_if_blank(value: Value) -> Value {
    match value {
        Value::String(s) if is_null_marker(s.trim()) => Value::Null,
        Value::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => Value::Null,
        other => other,
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// Parse the timestamp formats seen in scraped social-media exports.
///
/// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S%z`, `%Y-%m-%dT%H:%M:%S%.fZ`,
/// `%Y-%m-%d %H:%M:%S` and bare dates. Values without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
