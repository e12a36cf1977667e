//! Monthly aggregates, nationality frequencies and headline KPIs.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Dated, EnrichedPurchase, Event, Student, YearMonth};

/// Row count for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub label: String,
    pub count: usize,
}

/// Revenue and tickets for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    pub month: YearMonth,
    pub label: String,
    pub revenue: f64,
    pub tickets: usize,
}

/// Students per nationality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalityCount {
    pub nationality: String,
    pub count: usize,
}

/// Headline metrics of the filtered data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_revenue: f64,
    pub unique_participants: usize,
    pub events_organized: usize,
    pub tickets_sold: usize,
}

/// `total / count`, or `None` when there is nothing to divide by.
pub fn ratio(total: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| total / count as f64)
}

/// Rows per month of their relevant date, oldest month first. Rows without
/// a date are not counted.
pub fn count_per_month<T: Dated>(rows: &[T]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<YearMonth, usize> = BTreeMap::new();
    for date in rows.iter().filter_map(|row| row.relevant_date()) {
        *months.entry(YearMonth::of(&date)).or_default() += 1;
    }

    months
        .into_iter()
        .map(|(month, count)| MonthlyCount {
            label: month.display_label(),
            month,
            count,
        })
        .collect()
}

/// Revenue sum and ticket count per purchase month.
pub fn sales_per_month(purchases: &[EnrichedPurchase]) -> Vec<MonthlySales> {
    let mut months: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
    for purchase in purchases {
        if let Some(date) = purchase.purchase.purchase_date {
            let entry = months.entry(YearMonth::of(&date)).or_default();
            entry.0 += purchase.purchase.amount();
            entry.1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(month, (revenue, tickets))| MonthlySales {
            label: month.display_label(),
            month,
            revenue,
            tickets,
        })
        .collect()
}

/// Nationality frequencies, most frequent first, at most `top_n` entries.
///
/// Ties keep the order in which nationalities first appear in `students`.
/// Students without a nationality are ignored.
pub fn nationality_counts(students: &[Student], top_n: usize) -> Vec<NationalityCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for nationality in students.iter().filter_map(|s| s.nationality.as_deref()) {
        let count = counts.entry(nationality).or_insert_with(|| {
            order.push(nationality);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<NationalityCount> = order
        .into_iter()
        .map(|n| NationalityCount {
            nationality: n.to_string(),
            count: counts[n],
        })
        .collect();
    // stable sort keeps first-appearance order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

/// Distinct non-missing nationalities.
pub fn distinct_nationalities(students: &[Student]) -> usize {
    students
        .iter()
        .filter_map(|s| s.nationality.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Headline KPIs over the filtered purchases and events.
pub fn kpis(purchases: &[EnrichedPurchase], events: &[Event]) -> Kpis {
    Kpis {
        total_revenue: purchases.iter().map(|p| p.purchase.amount()).sum(),
        unique_participants: purchases
            .iter()
            .filter_map(|p| p.purchase.student_email.as_deref())
            .collect::<HashSet<_>>()
            .len(),
        events_organized: events.iter().map(|e| e.id.as_str()).collect::<HashSet<_>>().len(),
        tickets_sold: purchases.len(),
    }
}
