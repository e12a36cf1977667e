//! Table loading: CSV bytes → normalized columns → validated header → typed records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌──────────────┐
//! │ CSV file │──▶│  Parser  │──▶│ Normalizer │──▶│ Validator│──▶│ Vec<Student> │
//! │          │   │(auto-enc)│   │ (renames)  │   │ (schema) │   │ Vec<Event> …  │
//! └──────────┘   └──────────┘   └────────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! Unparseable dates never fail a load: they become `None` and are counted
//! in the [`TableSummary`].

pub mod normalize;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::SourcePaths;
use crate::error::{LoadError, LoadResult};
use crate::models::{Dated, Event, Purchase, Student};
use crate::parser::{parse_bytes_auto, parse_datetime};
use crate::validation::{validate_header, EVENTS_SCHEMA, PURCHASES_SCHEMA, STUDENTS_SCHEMA};

pub use normalize::{normalize_columns, EVENT_RENAMES, PURCHASE_RENAMES, STUDENT_RENAMES};

// =============================================================================
// Row access
// =============================================================================

/// Read-only view over one normalized CSV record.
pub struct Row<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Row<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    fn raw(&self, column: &str) -> &'a str {
        self.fields
            .get(column)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("")
    }

    /// Non-empty text cell.
    pub fn text(&self, column: &str) -> Option<String> {
        let raw = self.raw(column);
        (!raw.is_empty()).then(|| raw.to_string())
    }

    /// Text cell, empty string when absent.
    pub fn text_or_empty(&self, column: &str) -> String {
        self.raw(column).to_string()
    }

    /// Timestamp cell, `None` when empty or unparseable.
    pub fn datetime(&self, column: &str) -> Option<NaiveDateTime> {
        parse_datetime(self.raw(column))
    }

    /// Finite numeric cell.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.raw(column)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// True when the cell has content that is not a valid timestamp.
    fn has_bad_date(&self, column: &str) -> bool {
        !self.raw(column).is_empty() && self.datetime(column).is_none()
    }
}

// =============================================================================
// Source tables
// =============================================================================

/// A record type backed by one of the source CSV exports.
pub trait SourceRecord: Dated + Sized {
    /// Table name for logs and errors.
    const TABLE: &'static str;
    /// Column parsed as the record's timestamp.
    const DATE_COLUMN: &'static str;

    fn renames() -> &'static [(&'static str, &'static str)];
    fn schema() -> &'static Value;
    fn from_row(row: &Row<'_>) -> Self;
}

impl SourceRecord for Student {
    const TABLE: &'static str = "students";
    const DATE_COLUMN: &'static str = "registerDate";

    fn renames() -> &'static [(&'static str, &'static str)] {
        STUDENT_RENAMES
    }

    fn schema() -> &'static Value {
        &STUDENTS_SCHEMA
    }

    fn from_row(row: &Row<'_>) -> Self {
        Student {
            id: row.text_or_empty("student_id"),
            email: row.text("student_email"),
            esn_card: row.text("student_esnCard"),
            register_date: row.datetime(Self::DATE_COLUMN),
            nationality: row.text("nationality"),
        }
    }
}

impl SourceRecord for Event {
    const TABLE: &'static str = "events";
    const DATE_COLUMN: &'static str = "startDate";

    fn renames() -> &'static [(&'static str, &'static str)] {
        EVENT_RENAMES
    }

    fn schema() -> &'static Value {
        &EVENTS_SCHEMA
    }

    fn from_row(row: &Row<'_>) -> Self {
        Event {
            id: row.text_or_empty("event_id"),
            name: row.text("event_name"),
            start_date: row.datetime(Self::DATE_COLUMN),
        }
    }
}

impl SourceRecord for Purchase {
    const TABLE: &'static str = "purchases";
    const DATE_COLUMN: &'static str = "purchaseDate";

    fn renames() -> &'static [(&'static str, &'static str)] {
        PURCHASE_RENAMES
    }

    fn schema() -> &'static Value {
        &PURCHASES_SCHEMA
    }

    fn from_row(row: &Row<'_>) -> Self {
        Purchase {
            id: row.text_or_empty("purchase_id"),
            event_id: row.text("event_id"),
            student_email: row.text("student_email"),
            student_esn_card: row.text("student_esnCard"),
            purchase_date: row.datetime(Self::DATE_COLUMN),
            amount_paid: row.number("amountPaid"),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load diagnostics for one table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table: &'static str,
    pub source: String,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// Rows whose date is missing after parsing (empty or unparseable).
    pub missing_dates: usize,
    /// Subset of `missing_dates` that had content which failed to parse.
    pub unparseable_dates: usize,
}

/// Typed rows plus load diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedTable<T> {
    pub rows: Vec<T>,
    pub summary: TableSummary,
}

/// Parse, normalize, validate and type one table from raw bytes.
pub fn load_table<T: SourceRecord>(bytes: &[u8], source: &str) -> LoadResult<LoadedTable<T>> {
    let parsed = parse_bytes_auto(bytes).map_err(|e| LoadError::Csv {
        table: T::TABLE,
        source: e,
    })?;
    let parsed = normalize_columns(parsed, T::renames());

    validate_header(T::schema(), &parsed.headers).map_err(|errors| LoadError::Schema {
        table: T::TABLE,
        errors,
    })?;

    let mut unparseable_dates = 0;
    let rows: Vec<T> = parsed
        .records
        .iter()
        .filter_map(Value::as_object)
        .map(|fields| {
            let row = Row::new(fields);
            if row.has_bad_date(T::DATE_COLUMN) {
                unparseable_dates += 1;
            }
            T::from_row(&row)
        })
        .collect();

    let missing_dates = rows.iter().filter(|r| r.relevant_date().is_none()).count();

    Ok(LoadedTable {
        summary: TableSummary {
            table: T::TABLE,
            source: source.to_string(),
            encoding: parsed.encoding,
            delimiter: parsed.delimiter,
            headers: parsed.headers,
            row_count: rows.len(),
            missing_dates,
            unparseable_dates,
        },
        rows,
    })
}

/// Read a table from disk and load it.
pub fn load_table_file<T: SourceRecord>(path: &Path) -> LoadResult<LoadedTable<T>> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        table: T::TABLE,
        path: path.display().to_string(),
        source: e,
    })?;
    load_table(&bytes, &path.display().to_string())
}

/// The three source tables, loaded once and never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub students: Vec<Student>,
    pub events: Vec<Event>,
    pub purchases: Vec<Purchase>,
    pub summaries: Vec<TableSummary>,
}

impl Dataset {
    /// Assemble a dataset from already-typed tables.
    pub fn from_tables(
        students: LoadedTable<Student>,
        events: LoadedTable<Event>,
        purchases: LoadedTable<Purchase>,
    ) -> Self {
        Self {
            summaries: vec![students.summary, events.summary, purchases.summary],
            students: students.rows,
            events: events.rows,
            purchases: purchases.rows,
        }
    }

    /// Default date range: first and last purchase day.
    pub fn purchase_date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.purchases.iter().filter_map(|p| p.purchase_date);
        let (min, max) = dates.fold(None, |acc: Option<(NaiveDateTime, NaiveDateTime)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })?;
        Some((min.date(), max.date()))
    }
}

/// Load all three tables. Any failure aborts the whole load.
pub fn load_dataset(paths: &SourcePaths) -> LoadResult<Dataset> {
    log_info("📖 Loading source tables...");

    let students = load_table_file::<Student>(&paths.students)?;
    report(&students.summary);
    let events = load_table_file::<Event>(&paths.events)?;
    report(&events.summary);
    let purchases = load_table_file::<Purchase>(&paths.purchases)?;
    report(&purchases.summary);

    Ok(Dataset::from_tables(students, events, purchases))
}

fn report(summary: &TableSummary) {
    log_success(format!(
        "{}: {} rows from {} (encoding {}, delimiter '{}')",
        summary.table,
        summary.row_count,
        summary.source,
        summary.encoding,
        format_delimiter(summary.delimiter)
    ));
    if summary.missing_dates > 0 {
        log_warning(format!(
            "{}: {} rows without a date ({} unparseable)",
            summary.table, summary.missing_dates, summary.unparseable_dates
        ));
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
