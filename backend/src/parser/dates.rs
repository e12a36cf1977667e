//! Lenient timestamp parsing for the date columns of the source tables.
//!
//! Anything that does not match one of the accepted layouts yields `None`;
//! callers count those as missing dates instead of failing the load.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

/// Parse a timestamp cell.
///
/// Offsets (`Z`, `+01:00`) are converted to UTC; date-only values map to
/// midnight.
///
/// ```ignore
/// let dt = parse_datetime("2023-09-15T10:00:00.000Z").unwrap();
/// assert_eq!(dt.to_string(), "2023-09-15 10:00:00");
/// ```
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }

    parse_date(raw).map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a date-only cell or query parameter.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
