//! Domain models for the dashboard pipeline.
//!
//! This module contains the typed records every stage works on:
//!
//! - [`Student`], [`Event`], [`Purchase`] - one struct per source table
//! - [`EnrichedPurchase`] - a purchase widened with its event and student
//! - [`YearMonth`] - calendar month used as grouping and cohort key
//! - [`Semester`] - academic half-year derived from a date

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

// =============================================================================
// Source records
// =============================================================================

/// A chapter member, keyed by email + ESN card number.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: String,
    pub email: Option<String>,
    pub esn_card: Option<String>,
    pub register_date: Option<NaiveDateTime>,
    pub nationality: Option<String>,
}

/// An organized event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub name: Option<String>,
    pub start_date: Option<NaiveDateTime>,
}

/// A ticket purchase.
///
/// `event_id` and the (`student_email`, `student_esn_card`) pair are foreign
/// keys that may not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub id: String,
    pub event_id: Option<String>,
    pub student_email: Option<String>,
    pub student_esn_card: Option<String>,
    pub purchase_date: Option<NaiveDateTime>,
    pub amount_paid: Option<f64>,
}

impl Purchase {
    /// Amount paid, with missing amounts counting as zero.
    pub fn amount(&self) -> f64 {
        self.amount_paid.unwrap_or(0.0)
    }
}

/// A purchase widened with the attributes of its matched event and student.
///
/// Every field coming from the right-hand side of the joins is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPurchase {
    pub purchase: Purchase,
    pub semester: Option<Semester>,
    pub event_name: Option<String>,
    pub event_start: Option<NaiveDateTime>,
    pub student_id: Option<String>,
    pub register_date: Option<NaiveDateTime>,
    pub nationality: Option<String>,
}

// =============================================================================
// Dated rows
// =============================================================================

/// A row with one relevant date for filtering and monthly grouping.
pub trait Dated {
    fn relevant_date(&self) -> Option<NaiveDateTime>;
}

impl Dated for Student {
    fn relevant_date(&self) -> Option<NaiveDateTime> {
        self.register_date
    }
}

impl Dated for Event {
    fn relevant_date(&self) -> Option<NaiveDateTime> {
        self.start_date
    }
}

impl Dated for Purchase {
    fn relevant_date(&self) -> Option<NaiveDateTime> {
        self.purchase_date
    }
}

impl Dated for EnrichedPurchase {
    fn relevant_date(&self) -> Option<NaiveDateTime> {
        self.purchase.purchase_date
    }
}

// =============================================================================
// Year-month
// =============================================================================

/// A calendar month. Orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: &NaiveDateTime) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Whole months elapsed from `start` to `self` (negative if `self` is earlier).
    pub fn months_since(&self, start: &YearMonth) -> i32 {
        (self.year - start.year) * 12 + (self.month as i32 - start.month as i32)
    }

    /// Short label for chart axes, e.g. `Jan/2024`.
    pub fn display_label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(d) => d.format("%b/%Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Semester
// =============================================================================

/// Half of an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Half {
    /// August to January.
    First,
    /// February to July.
    Second,
}

/// An academic semester, e.g. `23.24-S1`.
///
/// `start_year` is the calendar year in which the academic year begins
/// (August). Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Semester {
    pub start_year: i32,
    pub half: Half,
}

/// Label used for rows whose date is missing.
pub const MISSING_LABEL: &str = "missing";

impl Semester {
    /// Semester containing `date`.
    ///
    /// August-December open the first semester of the academic year starting
    /// that calendar year; January closes the first semester of the previous
    /// one; February-July are the second semester of the previous one.
    pub fn of(date: &NaiveDateTime) -> Self {
        let year = date.year();
        match date.month() {
            8..=12 => Self {
                start_year: year,
                half: Half::First,
            },
            1 => Self {
                start_year: year - 1,
                half: Half::First,
            },
            _ => Self {
                start_year: year - 1,
                half: Half::Second,
            },
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let half = match self.half {
            Half::First => 1,
            Half::Second => 2,
        };
        write!(
            f,
            "{:02}.{:02}-S{}",
            self.start_year.rem_euclid(100),
            (self.start_year + 1).rem_euclid(100),
            half
        )
    }
}

impl Serialize for Semester {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
