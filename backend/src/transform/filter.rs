//! Period filtering.
//!
//! Two mutually exclusive modes, applied independently to each table on its
//! own relevant date (purchase date, event start, student registration):
//!
//! - **Semester**: keep rows whose semester label equals the selection, or
//!   everything for `"All"`.
//! - **Date range**: keep rows whose date falls inside `[from, to]`,
//!   compared by calendar day. Rows without a date are dropped.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::semester::{semester_label, ALL_SEMESTERS};
use crate::error::{QueryError, QueryResult};
use crate::models::Dated;
use crate::parser::parse_date;

/// Semester selector value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemesterChoice {
    All,
    Label(String),
}

impl SemesterChoice {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(ALL_SEMESTERS) {
            SemesterChoice::All
        } else {
            SemesterChoice::Label(raw.to_string())
        }
    }
}

/// Inclusive day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> QueryResult<Self> {
        if from > to {
            return Err(QueryError::InvertedRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        let day = date.date();
        self.from <= day && day <= self.to
    }
}

/// Active filter for one dashboard computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodFilter {
    Semester(SemesterChoice),
    DateRange(DateRange),
}

impl Default for PeriodFilter {
    fn default() -> Self {
        PeriodFilter::Semester(SemesterChoice::All)
    }
}

impl PeriodFilter {
    /// Build a filter from request parameters.
    ///
    /// `mode` defaults to semester mode. In date mode a missing bound falls
    /// back to `default_range` (the purchase date span).
    pub fn from_params(
        mode: Option<&str>,
        semester: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        default_range: Option<(NaiveDate, NaiveDate)>,
    ) -> QueryResult<Self> {
        match mode.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("semester") => Ok(PeriodFilter::Semester(SemesterChoice::parse(
                semester.unwrap_or(ALL_SEMESTERS),
            ))),
            Some("date") => {
                let from = match from {
                    Some(raw) => Some(parse_query_date(raw)?),
                    None => default_range.map(|(lo, _)| lo),
                };
                let to = match to {
                    Some(raw) => Some(parse_query_date(raw)?),
                    None => default_range.map(|(_, hi)| hi),
                };
                match (from, to) {
                    (Some(from), Some(to)) => Ok(PeriodFilter::DateRange(DateRange::new(from, to)?)),
                    _ => Err(QueryError::IncompleteRange),
                }
            }
            Some(other) => Err(QueryError::UnknownMode(other.to_string())),
        }
    }

    /// Whether a row with this date passes the filter.
    pub fn matches(&self, date: Option<&NaiveDateTime>) -> bool {
        match self {
            PeriodFilter::Semester(SemesterChoice::All) => true,
            PeriodFilter::Semester(SemesterChoice::Label(label)) => semester_label(date) == *label,
            PeriodFilter::DateRange(range) => date.is_some_and(|d| range.contains(d)),
        }
    }

    /// Human-readable description for reports.
    pub fn describe(&self) -> String {
        match self {
            PeriodFilter::Semester(SemesterChoice::All) => "All semesters".to_string(),
            PeriodFilter::Semester(SemesterChoice::Label(label)) => format!("Semester {}", label),
            PeriodFilter::DateRange(range) => format!("{} to {}", range.from, range.to),
        }
    }
}

fn parse_query_date(raw: &str) -> QueryResult<NaiveDate> {
    parse_date(raw).ok_or_else(|| QueryError::InvalidDate(raw.to_string()))
}

/// Rows of `rows` passing `filter` on their relevant date, in input order.
pub fn filter_rows<T: Dated + Clone>(rows: &[T], filter: &PeriodFilter) -> Vec<T> {
    rows.iter()
        .filter(|row| filter.matches(row.relevant_date().as_ref()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Event;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: &str, start: Option<NaiveDateTime>) -> Event {
        Event {
            id: id.into(),
            name: None,
            start_date: start,
        }
    }

    fn events() -> Vec<Event> {
        vec![
            event("e1", Some(date(2023, 9, 10).and_hms_opt(21, 0, 0).unwrap())),
            event("e2", Some(date(2024, 1, 31).and_hms_opt(23, 59, 0).unwrap())),
            event("e3", Some(date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap())),
        ]
    }

    fn ids(rows: &[Event]) -> Vec<&str> {
        rows.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_all_semesters_is_identity() {
        let mut rows = events();
        rows.push(event("e4", None));
        let filtered = filter_rows(&rows, &PeriodFilter::default());
        assert_eq!(filtered, rows);
    }

    #[test]
    fn test_full_date_range_is_identity() {
        let rows = events();
        let filter = PeriodFilter::DateRange(DateRange::new(date(2023, 9, 10), date(2024, 2, 1)).unwrap());
        assert_eq!(filter_rows(&rows, &filter), rows);
    }

    #[test]
    fn test_semester_selection() {
        let filter = PeriodFilter::Semester(SemesterChoice::parse("23.24-S1"));
        assert_eq!(ids(&filter_rows(&events(), &filter)), vec!["e1", "e2"]);

        let filter = PeriodFilter::Semester(SemesterChoice::parse("23.24-S2"));
        assert_eq!(ids(&filter_rows(&events(), &filter)), vec!["e3"]);
    }

    #[test]
    fn test_date_range_is_inclusive_by_day() {
        let filter = PeriodFilter::DateRange(DateRange::new(date(2024, 1, 31), date(2024, 1, 31)).unwrap());
        let mut rows = events();
        rows.push(event("e4", None));
        assert_eq!(ids(&filter_rows(&rows, &filter)), vec!["e2"]);
    }

    #[test]
    fn test_from_params() {
        let bounds = Some((date(2023, 9, 1), date(2024, 6, 30)));

        assert_eq!(
            PeriodFilter::from_params(None, None, None, None, bounds).unwrap(),
            PeriodFilter::default()
        );
        assert_eq!(
            PeriodFilter::from_params(Some("semester"), Some("all"), None, None, bounds).unwrap(),
            PeriodFilter::default()
        );
        assert_eq!(
            PeriodFilter::from_params(Some("date"), None, Some("2024-01-01"), None, bounds).unwrap(),
            PeriodFilter::DateRange(DateRange {
                from: date(2024, 1, 1),
                to: date(2024, 6, 30)
            })
        );
    }

    #[test]
    fn test_from_params_errors() {
        assert_eq!(
            PeriodFilter::from_params(Some("week"), None, None, None, None),
            Err(QueryError::UnknownMode("week".into()))
        );
        assert_eq!(
            PeriodFilter::from_params(Some("date"), None, Some("31-31-2024"), None, None),
            Err(QueryError::InvalidDate("31-31-2024".into()))
        );
        assert_eq!(
            PeriodFilter::from_params(Some("date"), None, None, None, None),
            Err(QueryError::IncompleteRange)
        );
        assert!(matches!(
            PeriodFilter::from_params(Some("date"), None, Some("2024-02-01"), Some("2024-01-01"), None),
            Err(QueryError::InvertedRange { .. })
        ));
    }
}
