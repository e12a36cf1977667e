//! Raw-data browser and CSV export.
//!
//! Every record type renders to an ordered list of named string cells, so the
//! same field selection drives both the capped on-screen table and the full
//! CSV download.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::str::FromStr;

use super::semester::semester_label;
use crate::config::DEFAULT_FIELD_COUNT;
use crate::error::{ExportResult, QueryError, QueryResult};
use crate::models::{EnrichedPurchase, Event, Student};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_datetime(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format(DATETIME_FORMAT).to_string()).unwrap_or_default()
}

fn fmt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// A record that can be shown as a table row.
pub trait Tabular {
    /// Column names in display order.
    const COLUMNS: &'static [&'static str];

    /// Cell text, `None` for a column this type does not have. Missing
    /// values render as empty strings.
    fn cell(&self, column: &str) -> Option<String>;
}

impl Tabular for EnrichedPurchase {
    const COLUMNS: &'static [&'static str] = &[
        "semester",
        "purchase_id",
        "event_id",
        "student_email",
        "student_esnCard",
        "purchaseDate",
        "amountPaid",
        "event_name",
        "startDate",
        "student_id",
        "registerDate",
        "nationality",
    ];

    fn cell(&self, column: &str) -> Option<String> {
        let p = &self.purchase;
        Some(match column {
            "semester" => semester_label(p.purchase_date.as_ref()),
            "purchase_id" => p.id.clone(),
            "event_id" => fmt_text(&p.event_id),
            "student_email" => fmt_text(&p.student_email),
            "student_esnCard" => fmt_text(&p.student_esn_card),
            "purchaseDate" => fmt_datetime(p.purchase_date),
            "amountPaid" => p.amount_paid.map(|a| a.to_string()).unwrap_or_default(),
            "event_name" => fmt_text(&self.event_name),
            "startDate" => fmt_datetime(self.event_start),
            "student_id" => fmt_text(&self.student_id),
            "registerDate" => fmt_datetime(self.register_date),
            "nationality" => fmt_text(&self.nationality),
            _ => return None,
        })
    }
}

impl Tabular for Event {
    const COLUMNS: &'static [&'static str] = &["semester", "event_id", "event_name", "startDate"];

    fn cell(&self, column: &str) -> Option<String> {
        Some(match column {
            "semester" => semester_label(self.start_date.as_ref()),
            "event_id" => self.id.clone(),
            "event_name" => fmt_text(&self.name),
            "startDate" => fmt_datetime(self.start_date),
            _ => return None,
        })
    }
}

impl Tabular for Student {
    const COLUMNS: &'static [&'static str] = &[
        "student_id",
        "student_email",
        "student_esnCard",
        "registerDate",
        "nationality",
    ];

    fn cell(&self, column: &str) -> Option<String> {
        Some(match column {
            "student_id" => self.id.clone(),
            "student_email" => fmt_text(&self.email),
            "student_esnCard" => fmt_text(&self.esn_card),
            "registerDate" => fmt_datetime(self.register_date),
            "nationality" => fmt_text(&self.nationality),
            _ => return None,
        })
    }
}

// =============================================================================
// Dataset selector
// =============================================================================

/// Which table the raw-data browser shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Purchases,
    Events,
    Students,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Purchases => "purchases",
            DatasetKind::Events => "events",
            DatasetKind::Students => "students",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Purchases => EnrichedPurchase::COLUMNS,
            DatasetKind::Events => Event::COLUMNS,
            DatasetKind::Students => Student::COLUMNS,
        }
    }

    /// Download name, e.g. `purchases_filtrado.csv`.
    pub fn export_filename(&self) -> String {
        format!("{}_filtrado.csv", self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purchases" => Ok(DatasetKind::Purchases),
            "events" => Ok(DatasetKind::Events),
            "students" => Ok(DatasetKind::Students),
            _ => Err(QueryError::UnknownDataset(s.to_string())),
        }
    }
}

// =============================================================================
// Field selection
// =============================================================================

/// Resolve the requested fields against a column list.
///
/// An empty request selects the first ten columns. Duplicates are dropped,
/// request order is kept, and any unknown field fails the whole request.
pub fn select_fields(kind: DatasetKind, requested: &[String]) -> QueryResult<Vec<String>> {
    let columns = kind.columns();

    if requested.iter().all(|f| f.trim().is_empty()) {
        return Ok(columns
            .iter()
            .take(DEFAULT_FIELD_COUNT)
            .map(|c| c.to_string())
            .collect());
    }

    let mut selected: Vec<String> = Vec::new();
    let mut unknown: Vec<String> = Vec::new();
    for field in requested.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
        if !columns.contains(&field) {
            unknown.push(field.to_string());
        } else if !selected.iter().any(|s| s == field) {
            selected.push(field.to_string());
        }
    }

    if unknown.is_empty() {
        Ok(selected)
    } else {
        Err(QueryError::UnknownFields {
            dataset: kind.as_str().to_string(),
            fields: unknown,
        })
    }
}

/// Split a comma-separated field list.
pub fn parse_field_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect())
        .unwrap_or_default()
}

// =============================================================================
// Table and export
// =============================================================================

/// The on-screen raw table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub dataset: DatasetKind,
    pub available_columns: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub truncated: bool,
    pub notice: Option<String>,
}

fn render_row<T: Tabular>(record: &T, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| record.cell(f).unwrap_or_default())
        .collect()
}

/// First `max_rows` records, rendered for the selected fields.
pub fn raw_table<T: Tabular>(kind: DatasetKind, records: &[T], fields: &[String], max_rows: usize) -> RawTable {
    let truncated = records.len() > max_rows;
    RawTable {
        dataset: kind,
        available_columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
        columns: fields.to_vec(),
        rows: records
            .iter()
            .take(max_rows)
            .map(|r| render_row(r, fields))
            .collect(),
        total_rows: records.len(),
        truncated,
        notice: truncated.then(|| {
            format!(
                "Showing only the first {} of {} rows. Narrow the filters or download the full CSV.",
                max_rows,
                records.len()
            )
        }),
    }
}

/// All records as CSV (comma-separated, header row).
pub fn export_csv<T: Tabular>(records: &[T], fields: &[String]) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    for record in records {
        writer.write_record(render_row(record, fields))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// A CSV download ready to be served or written.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: Vec<u8>,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_table;
    use crate::models::Purchase;
    use crate::parser::parse_bytes_auto;
    use chrono::NaiveDate;

    fn enriched(i: usize, email: Option<&str>, amount: Option<f64>) -> EnrichedPurchase {
        EnrichedPurchase {
            purchase: Purchase {
                id: format!("p{}", i),
                event_id: Some("e1".into()),
                student_email: email.map(String::from),
                student_esn_card: Some("ESN1".into()),
                purchase_date: NaiveDate::from_ymd_opt(2024, 2, 1 + (i % 28) as u32)
                    .and_then(|d| d.and_hms_opt(10, 30, 0)),
                amount_paid: amount,
            },
            semester: None,
            event_name: Some("Douro Trip, day 1".into()),
            event_start: None,
            student_id: None,
            register_date: None,
            nationality: Some("Brazil".into()),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dataset_kind_parsing() {
        assert_eq!("Purchases".parse::<DatasetKind>(), Ok(DatasetKind::Purchases));
        assert_eq!(" events ".parse::<DatasetKind>(), Ok(DatasetKind::Events));
        assert_eq!(
            "tickets".parse::<DatasetKind>(),
            Err(QueryError::UnknownDataset("tickets".into()))
        );
        assert_eq!(DatasetKind::Students.export_filename(), "students_filtrado.csv");
    }

    #[test]
    fn test_default_fields_start_with_semester() {
        let selected = select_fields(DatasetKind::Purchases, &[]).unwrap();
        assert_eq!(selected.len(), 10);
        assert_eq!(selected[0], "semester");

        let selected = select_fields(DatasetKind::Students, &[]).unwrap();
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn test_field_selection_keeps_order_and_rejects_unknown() {
        let selected = select_fields(
            DatasetKind::Events,
            &fields(&["event_name", "semester", "event_name"]),
        )
        .unwrap();
        assert_eq!(selected, vec!["event_name", "semester"]);

        let err = select_fields(DatasetKind::Events, &fields(&["event_name", "price"])).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownFields {
                dataset: "events".into(),
                fields: vec!["price".into()]
            }
        );
    }

    #[test]
    fn test_parse_field_list() {
        assert_eq!(parse_field_list(Some("a, b,,c ")), vec!["a", "b", "c"]);
        assert!(parse_field_list(None).is_empty());
    }

    #[test]
    fn test_raw_table_caps_rows() {
        let records: Vec<EnrichedPurchase> = (0..5).map(|i| enriched(i, Some("a@x"), Some(3.0))).collect();
        let table = raw_table(DatasetKind::Purchases, &records, &fields(&["purchase_id", "semester"]), 3);

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.total_rows, 5);
        assert!(table.truncated);
        assert!(table.notice.is_some());
        assert_eq!(table.rows[0], vec!["p0", "23.24-S2"]);

        let table = raw_table(DatasetKind::Purchases, &records, &fields(&["purchase_id"]), 1000);
        assert!(!table.truncated);
        assert!(table.notice.is_none());
    }

    #[test]
    fn test_export_round_trip() {
        let records = vec![
            enriched(0, Some("ana@example.com"), Some(12.5)),
            enriched(1, None, None),
            enriched(2, Some("luca@example.com"), Some(10.0)),
        ];
        let selected = select_fields(DatasetKind::Purchases, &[]).unwrap();

        let bytes = export_csv(&records, &selected).unwrap();
        let reread = parse_bytes_auto(&bytes).unwrap();

        assert_eq!(reread.headers, selected);
        assert_eq!(reread.records.len(), records.len());
        for (record, row) in records.iter().zip(&reread.records) {
            for field in &selected {
                assert_eq!(row[field.as_str()], record.cell(field).unwrap(), "field {}", field);
            }
        }
    }

    #[test]
    fn test_student_export_reloads_as_source_table() {
        let students = vec![Student {
            id: "s1".into(),
            email: Some("ana@example.com".into()),
            esn_card: Some("ESN1".into()),
            register_date: NaiveDate::from_ymd_opt(2023, 9, 4).and_then(|d| d.and_hms_opt(9, 0, 0)),
            nationality: Some("Portugal".into()),
        }];
        let selected = select_fields(DatasetKind::Students, &[]).unwrap();

        let bytes = export_csv(&students, &selected).unwrap();
        let reloaded = load_table::<Student>(&bytes, "export.csv").unwrap();

        assert_eq!(reloaded.rows, students);
    }
}
