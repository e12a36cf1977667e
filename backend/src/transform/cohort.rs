//! Cohort retention analysis.
//!
//! Each student (keyed by email) belongs to the cohort of the month of their
//! first purchase in the filtered data. For every cohort and every elapsed
//! month `k` we count the distinct students who bought something `k` months
//! after their cohort month, then express it as a percentage of the cohort
//! size (the count at `k = 0`).
//!
//! ```text
//!            Month 0   Month 1   Month 2
//! Sep/2023    100.0      40.0      20.0
//! Oct/2023    100.0      50.0        -
//! Nov/2023    100.0        -         -
//! ```
//!
//! The matrix is jagged: a cell no student reached is absent, never zero.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{EnrichedPurchase, YearMonth};

/// One cohort row, aligned with [`CohortAnalysis::month_numbers`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRow {
    pub cohort: YearMonth,
    pub label: String,
    /// Distinct students in the cohort (count at month 0).
    pub size: usize,
    pub counts: Vec<Option<usize>>,
    pub retention: Vec<Option<f64>>,
}

/// Average retention of one elapsed-month column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRetention {
    pub month_number: u32,
    pub label: String,
    pub average: f64,
    /// Cohorts with a value in this column.
    pub cohorts: usize,
}

/// Retention heatmap plus summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortAnalysis {
    /// Elapsed months present in at least one cohort, ascending.
    pub month_numbers: Vec<u32>,
    pub rows: Vec<CohortRow>,
    pub average_retention: Vec<MonthRetention>,
    /// Mean of the per-column averages.
    pub overall_mean: Option<f64>,
    pub max_retention: Option<f64>,
    pub min_retention: Option<f64>,
}

/// Build the cohort retention matrix from filtered purchases.
///
/// Purchases without a student email or a purchase date are ignored.
pub fn cohort_analysis(purchases: &[EnrichedPurchase]) -> CohortAnalysis {
    // (email, purchase month) for every usable purchase
    let dated: Vec<(&str, YearMonth)> = purchases
        .iter()
        .filter_map(|p| {
            let email = p.purchase.student_email.as_deref()?;
            let date = p.purchase.purchase_date?;
            Some((email, YearMonth::of(&date)))
        })
        .collect();

    // cohort month = month of the earliest purchase
    let mut cohort_of: HashMap<&str, YearMonth> = HashMap::new();
    for &(email, month) in &dated {
        cohort_of
            .entry(email)
            .and_modify(|c| *c = (*c).min(month))
            .or_insert(month);
    }

    // distinct students per (cohort, month_number)
    let mut cells: BTreeMap<YearMonth, BTreeMap<u32, HashSet<&str>>> = BTreeMap::new();
    for &(email, month) in &dated {
        let cohort = cohort_of[email];
        let month_number = u32::try_from(month.months_since(&cohort)).unwrap_or(0);
        cells
            .entry(cohort)
            .or_default()
            .entry(month_number)
            .or_default()
            .insert(email);
    }

    let month_numbers: Vec<u32> = cells
        .values()
        .flat_map(|row| row.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows: Vec<CohortRow> = cells
        .into_iter()
        .map(|(cohort, row)| {
            let size = row.get(&0).map_or(0, HashSet::len);
            let counts: Vec<Option<usize>> = month_numbers
                .iter()
                .map(|k| row.get(k).map(HashSet::len))
                .collect();
            let retention = counts
                .iter()
                .map(|c| c.filter(|_| size > 0).map(|c| 100.0 * c as f64 / size as f64))
                .collect();
            CohortRow {
                label: cohort.display_label(),
                cohort,
                size,
                counts,
                retention,
            }
        })
        .collect();

    let average_retention: Vec<MonthRetention> = month_numbers
        .iter()
        .enumerate()
        .filter_map(|(col, &month_number)| {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.retention[col]).collect();
            mean(&values).map(|average| MonthRetention {
                month_number,
                label: format!("Month {}", month_number),
                average,
                cohorts: values.len(),
            })
        })
        .collect();

    let all_cells: Vec<f64> = rows.iter().flat_map(|r| r.retention.iter().flatten().copied()).collect();
    let column_means: Vec<f64> = average_retention.iter().map(|m| m.average).collect();

    CohortAnalysis {
        month_numbers,
        overall_mean: mean(&column_means),
        max_retention: all_cells.iter().copied().reduce(f64::max),
        min_retention: all_cells.iter().copied().reduce(f64::min),
        rows,
        average_retention,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
