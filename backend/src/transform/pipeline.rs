//! High-level dashboard API.
//!
//! Combines every step of one dashboard computation: join, filter,
//! aggregate and cohort analysis. The loaded [`Dataset`] is never mutated;
//! each call derives a fresh [`DashboardReport`] from it.
//!
//! # Example
//!
//! ```rust,ignore
//! use esn_dashboard::config::SourcePaths;
//! use esn_dashboard::loader::load_dataset;
//! use esn_dashboard::pipeline::{build_dashboard, DashboardQuery};
//!
//! let dataset = load_dataset(&SourcePaths::in_dir("data"))?;
//! let report = build_dashboard(&dataset, &DashboardQuery::default());
//!
//! println!("{} tickets sold", report.kpis.tickets_sold);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::aggregate::{
    count_per_month, distinct_nationalities, kpis, nationality_counts, ratio, sales_per_month, Kpis,
    NationalityCount,
};
use super::browser::{export_csv, raw_table, select_fields, CsvExport, DatasetKind, RawTable};
use super::cohort::{cohort_analysis, CohortAnalysis};
use super::filter::{filter_rows, DateRange, PeriodFilter};
use super::join::enrich_purchases;
use super::semester::available_semesters;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::{clamp_top_n, DEFAULT_TOP_N};
use crate::error::{DashboardResult, QueryResult};
use crate::loader::Dataset;
use crate::models::{EnrichedPurchase, Event, Student};

// =============================================================================
// Filtering
// =============================================================================

/// The three tables after join and period filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredData {
    pub purchases: Vec<EnrichedPurchase>,
    pub events: Vec<Event>,
    pub students: Vec<Student>,
}

/// Join purchases with events and students, then filter each table on its
/// own date.
pub fn apply_filter(dataset: &Dataset, filter: &PeriodFilter) -> FilteredData {
    let enriched = enrich_purchases(&dataset.purchases, &dataset.events, &dataset.students);
    FilteredData {
        purchases: filter_rows(&enriched, filter),
        events: filter_rows(&dataset.events, filter),
        students: filter_rows(&dataset.students, filter),
    }
}

/// Values for the filter controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// `"All"` first, then semesters oldest first.
    pub semesters: Vec<String>,
    /// First and last purchase day.
    pub default_range: Option<DateRange>,
}

pub fn filter_options(dataset: &Dataset) -> FilterOptions {
    let enriched = enrich_purchases(&dataset.purchases, &dataset.events, &dataset.students);
    FilterOptions {
        semesters: available_semesters(&enriched),
        default_range: dataset
            .purchase_date_bounds()
            .map(|(from, to)| DateRange { from, to }),
    }
}

// =============================================================================
// Charts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
}

/// A single-series chart ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
}

impl Chart {
    fn new(kind: ChartKind, title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            points: Vec::new(),
        }
    }

    fn with_points(mut self, points: impl IntoIterator<Item = (String, f64)>) -> Self {
        self.points = points.into_iter().map(|(x, y)| ChartPoint { x, y }).collect();
        self
    }
}

// =============================================================================
// Report
// =============================================================================

/// Parameters of one dashboard computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardQuery {
    pub filter: PeriodFilter,
    pub top_n: usize,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            filter: PeriodFilter::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl DashboardQuery {
    pub fn new(filter: PeriodFilter, top_n: Option<usize>) -> Self {
        Self {
            filter,
            top_n: clamp_top_n(top_n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSection {
    pub chart: Chart,
    pub total: usize,
    /// Mean registrations per month that has any.
    pub monthly_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSection {
    pub revenue_chart: Chart,
    pub tickets_chart: Chart,
    pub total_revenue: f64,
    pub total_tickets: usize,
    pub average_ticket: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalitySection {
    pub top_n: usize,
    pub chart: Chart,
    pub entries: Vec<NationalityCount>,
    pub total_nationalities: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSection {
    pub analysis: CohortAnalysis,
    pub average_chart: Chart,
}

/// Everything the dashboard shows for one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub filter: String,
    pub kpis: Kpis,
    pub registrations: RegistrationSection,
    pub events: Chart,
    pub sales: SalesSection,
    pub nationalities: NationalitySection,
    pub cohort: CohortSection,
}

/// Compute the full dashboard for `query`.
pub fn build_dashboard(dataset: &Dataset, query: &DashboardQuery) -> DashboardReport {
    log_info(format!("📊 Building dashboard ({})", query.filter.describe()));
    let data = apply_filter(dataset, &query.filter);
    log_info(format!(
        "Filtered: {} purchases, {} events, {} students",
        data.purchases.len(),
        data.events.len(),
        data.students.len()
    ));
    if data.purchases.is_empty() {
        log_warning("No purchases in the selected period");
    }

    let registrations = count_per_month(&data.students);
    let registered: usize = registrations.iter().map(|m| m.count).sum();
    let registrations = RegistrationSection {
        monthly_average: ratio(registered as f64, registrations.len()),
        total: registered,
        chart: Chart::new(ChartKind::Bar, "Student registrations per month", "Month", "Registrations")
            .with_points(registrations.into_iter().map(|m| (m.label, m.count as f64))),
    };

    let events = Chart::new(ChartKind::Bar, "Events per month", "Month", "Events")
        .with_points(count_per_month(&data.events).into_iter().map(|m| (m.label, m.count as f64)));

    let monthly_sales = sales_per_month(&data.purchases);
    let total_revenue: f64 = monthly_sales.iter().map(|m| m.revenue).sum();
    let total_tickets: usize = monthly_sales.iter().map(|m| m.tickets).sum();
    let sales = SalesSection {
        revenue_chart: Chart::new(ChartKind::Bar, "Revenue per month", "Month", "Revenue (€)")
            .with_points(monthly_sales.iter().map(|m| (m.label.clone(), m.revenue))),
        tickets_chart: Chart::new(ChartKind::Bar, "Tickets sold per month", "Month", "Tickets")
            .with_points(monthly_sales.iter().map(|m| (m.label.clone(), m.tickets as f64))),
        average_ticket: ratio(total_revenue, total_tickets),
        total_revenue,
        total_tickets,
    };

    let entries = nationality_counts(&data.students, query.top_n);
    let nationalities = NationalitySection {
        top_n: query.top_n,
        chart: Chart::new(
            ChartKind::HorizontalBar,
            &format!("Top {} nationalities", query.top_n),
            "Students",
            "Nationality",
        )
        .with_points(entries.iter().map(|n| (n.nationality.clone(), n.count as f64))),
        entries,
        total_nationalities: distinct_nationalities(&data.students),
        total_students: data.students.len(),
    };

    let analysis = cohort_analysis(&data.purchases);
    log_success(format!("{} cohorts analysed", analysis.rows.len()));
    let cohort = CohortSection {
        average_chart: Chart::new(ChartKind::Line, "Average retention by month", "Months since first purchase", "Retention (%)")
            .with_points(analysis.average_retention.iter().map(|m| (m.label.clone(), m.average))),
        analysis,
    };

    DashboardReport {
        report_id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        filter: query.filter.describe(),
        kpis: kpis(&data.purchases, &data.events),
        registrations,
        events,
        sales,
        nationalities,
        cohort,
    }
}

// =============================================================================
// Raw data
// =============================================================================

/// Capped raw table of one filtered dataset.
pub fn browse(
    dataset: &Dataset,
    filter: &PeriodFilter,
    kind: DatasetKind,
    fields: &[String],
    max_rows: usize,
) -> QueryResult<RawTable> {
    let fields = select_fields(kind, fields)?;
    let data = apply_filter(dataset, filter);
    Ok(match kind {
        DatasetKind::Purchases => raw_table(kind, &data.purchases, &fields, max_rows),
        DatasetKind::Events => raw_table(kind, &data.events, &fields, max_rows),
        DatasetKind::Students => raw_table(kind, &data.students, &fields, max_rows),
    })
}

/// All rows of one filtered dataset as CSV.
pub fn export(
    dataset: &Dataset,
    filter: &PeriodFilter,
    kind: DatasetKind,
    fields: &[String],
) -> DashboardResult<CsvExport> {
    let fields = select_fields(kind, fields)?;
    let data = apply_filter(dataset, filter);
    let (content, rows) = match kind {
        DatasetKind::Purchases => (export_csv(&data.purchases, &fields)?, data.purchases.len()),
        DatasetKind::Events => (export_csv(&data.events, &fields)?, data.events.len()),
        DatasetKind::Students => (export_csv(&data.students, &fields)?, data.students.len()),
    };
    log_success(format!("Exported {} {} rows", rows, kind.as_str()));
    Ok(CsvExport {
        filename: kind.export_filename(),
        content,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DashboardError, QueryError};
    use crate::loader::load_table;
    use crate::models::Purchase;
    use crate::transform::filter::SemesterChoice;
    use chrono::NaiveDate;

    const STUDENTS: &[u8] = b"_id,email,esnCardNumber,registerDate,nationality\n\
        s1,ana@example.com,ESN1,2023-09-01,Portugal\n\
        s2,ben@example.com,ESN2,2023-09-15,Germany\n\
        s3,carla@example.com,ESN3,2024-02-10,Portugal\n";

    const EVENTS: &[u8] = b"_id,name,startDate\n\
        e1,Welcome Party,2023-09-20 21:00:00\n\
        e2,Lisbon Trip,2024-03-02 08:00:00\n";

    const PURCHASES: &[u8] = b"_id,eventId,student_email,student_esnCard,purchaseDate,amountPaid\n\
        p1,e1,ana@example.com,ESN1,2023-09-05 18:00:00,10\n\
        p2,e1,ben@example.com,ESN2,2023-09-18 18:00:00,20\n\
        p3,e2,ana@example.com,ESN1,2023-10-02 12:00:00,30\n\
        p4,e2,carla@example.com,ESN3,2024-02-20 12:00:00,\n";

    fn dataset() -> Dataset {
        Dataset::from_tables(
            load_table::<Student>(STUDENTS, "students.csv").unwrap(),
            load_table::<Event>(EVENTS, "events.csv").unwrap(),
            load_table::<Purchase>(PURCHASES, "event_purchases.csv").unwrap(),
        )
    }

    fn semester(label: &str) -> PeriodFilter {
        PeriodFilter::Semester(SemesterChoice::parse(label))
    }

    #[test]
    fn test_filter_options() {
        let options = filter_options(&dataset());

        assert_eq!(options.semesters, vec!["All", "23.24-S1", "23.24-S2"]);
        let range = options.default_range.unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2023, 9, 5).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());
    }

    #[test]
    fn test_dashboard_for_all_semesters() {
        let report = build_dashboard(&dataset(), &DashboardQuery::default());

        assert_eq!(report.filter, "All semesters");
        assert_eq!(report.kpis.total_revenue, 60.0);
        assert_eq!(report.kpis.unique_participants, 3);
        assert_eq!(report.kpis.events_organized, 2);
        assert_eq!(report.kpis.tickets_sold, 4);

        assert_eq!(report.registrations.total, 3);
        assert_eq!(report.registrations.monthly_average, Some(1.5));
        assert_eq!(report.registrations.chart.points[0].x, "Sep/2023");

        assert_eq!(report.sales.total_tickets, 4);
        assert_eq!(report.sales.average_ticket, Some(15.0));

        assert_eq!(report.nationalities.entries[0].nationality, "Portugal");
        assert_eq!(report.nationalities.total_nationalities, 2);
        assert_eq!(report.nationalities.total_students, 3);
        assert_eq!(report.nationalities.chart.kind, ChartKind::HorizontalBar);

        // ana: Sep cohort, returns in Oct
        let sep = &report.cohort.analysis.rows[0];
        assert_eq!(sep.size, 2);
        assert_eq!(sep.counts[1], Some(1));
        assert_eq!(report.cohort.average_chart.points[0].y, 100.0);
    }

    #[test]
    fn test_dashboard_for_one_semester() {
        let report = build_dashboard(&dataset(), &DashboardQuery::new(semester("23.24-S2"), None));

        assert_eq!(report.kpis.tickets_sold, 1);
        assert_eq!(report.kpis.total_revenue, 0.0);
        assert_eq!(report.kpis.events_organized, 1);
        assert_eq!(report.nationalities.total_students, 1);
    }

    #[test]
    fn test_empty_selection_has_undefined_averages() {
        let report = build_dashboard(&dataset(), &DashboardQuery::new(semester("30.31-S1"), Some(100)));

        assert_eq!(report.kpis.tickets_sold, 0);
        assert_eq!(report.sales.average_ticket, None);
        assert_eq!(report.registrations.monthly_average, None);
        assert!(report.cohort.analysis.rows.is_empty());
        assert_eq!(report.nationalities.top_n, 50);
    }

    #[test]
    fn test_report_serializes_null_ratios() {
        let report = build_dashboard(&dataset(), &DashboardQuery::new(semester("30.31-S1"), None));
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["sales"]["averageTicket"].is_null());
        assert!(json["reportId"].is_string());
    }

    #[test]
    fn test_browse_and_export_share_field_selection() {
        let dataset = dataset();
        let fields = vec!["event_name".to_string(), "amountPaid".to_string()];

        let table = browse(&dataset, &PeriodFilter::default(), DatasetKind::Purchases, &fields, 2).unwrap();
        assert_eq!(table.columns, fields);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.total_rows, 4);
        assert_eq!(table.rows[0], vec!["Welcome Party", "10"]);

        let export = export(&dataset, &PeriodFilter::default(), DatasetKind::Purchases, &fields).unwrap();
        assert_eq!(export.filename, "purchases_filtrado.csv");
        assert_eq!(export.rows, 4);
        let text = String::from_utf8(export.content).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("event_name,amountPaid\n"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = export(
            &dataset(),
            &PeriodFilter::default(),
            DatasetKind::Students,
            &["nickname".to_string()],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DashboardError::Query(QueryError::UnknownFields { .. })
        ));
    }
}
