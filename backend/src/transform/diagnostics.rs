//! Date coverage per source table.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::loader::{Dataset, TableSummary};
use crate::models::Dated;

/// Date span and gaps of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateDiagnostics {
    pub table: String,
    pub column: String,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub total_rows: usize,
    /// Rows without a usable date.
    pub missing: usize,
    /// Part of `missing` whose cell held text that failed to parse.
    pub unparseable: usize,
}

/// Diagnose one table of dated rows. `unparseable` is the load summary count.
pub fn diagnose<T: Dated>(table: &str, column: &str, rows: &[T], unparseable: usize) -> DateDiagnostics {
    let dates: Vec<NaiveDateTime> = rows.iter().filter_map(|r| r.relevant_date()).collect();
    DateDiagnostics {
        table: table.to_string(),
        column: column.to_string(),
        earliest: dates.iter().min().copied(),
        latest: dates.iter().max().copied(),
        total_rows: rows.len(),
        missing: rows.len() - dates.len(),
        unparseable,
    }
}

fn unparseable_in(summaries: &[TableSummary], table: &str) -> usize {
    summaries
        .iter()
        .find(|s| s.table == table)
        .map_or(0, |s| s.unparseable_dates)
}

/// Diagnostics for students, events and purchases, in that order.
pub fn date_diagnostics(dataset: &Dataset) -> Vec<DateDiagnostics> {
    let unparseable = |table: &str| unparseable_in(&dataset.summaries, table);
    vec![
        diagnose("students", "registerDate", &dataset.students, unparseable("students")),
        diagnose("events", "startDate", &dataset.events, unparseable("events")),
        diagnose("purchases", "purchaseDate", &dataset.purchases, unparseable("purchases")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_table;
    use crate::models::{Event, Purchase, Student};

    fn dataset() -> Dataset {
        let students = load_table::<Student>(
            b"_id,email,esnCardNumber,registerDate,nationality\n\
              s1,a@x,C1,2023-09-01,Spain\n\
              s2,b@x,C2,yesterday,Italy\n\
              s3,c@x,C3,,France\n",
            "students.csv",
        )
        .unwrap();
        let events = load_table::<Event>(
            b"_id,name,startDate\ne1,Welcome,2023-09-10 20:00:00\ne2,Trip,2024-03-02\n",
            "events.csv",
        )
        .unwrap();
        let purchases = load_table::<Purchase>(
            b"_id,eventId,student_email,student_esnCard,purchaseDate,amountPaid\n",
            "event_purchases.csv",
        )
        .unwrap();
        Dataset::from_tables(students, events, purchases)
    }

    #[test]
    fn test_counts_missing_and_unparseable() {
        let report = date_diagnostics(&dataset());

        let students = &report[0];
        assert_eq!(students.table, "students");
        assert_eq!(students.total_rows, 3);
        assert_eq!(students.missing, 2);
        assert_eq!(students.unparseable, 1);
        assert_eq!(students.earliest, students.latest);
    }

    #[test]
    fn test_span() {
        let report = date_diagnostics(&dataset());

        let events = &report[1];
        assert_eq!(events.earliest.map(|d| d.to_string()).as_deref(), Some("2023-09-10 20:00:00"));
        assert_eq!(events.latest.map(|d| d.to_string()).as_deref(), Some("2024-03-02 00:00:00"));
        assert_eq!(events.missing, 0);
    }

    #[test]
    fn test_diagnose_takes_unparseable_count() {
        let events = vec![Event {
            id: "e1".into(),
            name: None,
            start_date: None,
        }];

        let entry = diagnose("events", "startDate", &events, 1);

        assert_eq!(entry.total_rows, 1);
        assert_eq!(entry.missing, 1);
        assert_eq!(entry.unparseable, 1);
    }

    #[test]
    fn test_empty_table() {
        let report = date_diagnostics(&dataset());

        let purchases = &report[2];
        assert_eq!(purchases.total_rows, 0);
        assert_eq!(purchases.earliest, None);
        assert_eq!(purchases.latest, None);
    }
}
