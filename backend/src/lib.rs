//! # ESN Dashboard - chapter activity analytics
//!
//! Loads the students, events and purchases CSV exports of an ESN chapter,
//! joins them, labels academic semesters and computes the dashboard:
//! KPIs, monthly series, nationalities and cohort retention.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CSV files  │────▶│   Loader    │────▶│ Join+Filter  │────▶│  Dashboard  │
//! │  (3 tables) │     │ (auto-enc)  │     │ (semester/…) │     │ (JSON, CSV) │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use esn_dashboard::{build_dashboard, load_dataset, DashboardQuery, SourcePaths};
//!
//! let dataset = load_dataset(&SourcePaths::in_dir("data")).unwrap();
//! let report = build_dashboard(&dataset, &DashboardQuery::default());
//! println!("Revenue: {:.2}", report.kpis.total_revenue);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain records (Student, Event, Purchase, Semester)
//! - [`config`] - Environment configuration and defaults
//! - [`parser`] - CSV parsing with auto-detection
//! - [`loader`] - Column normalization and typed tables
//! - [`validation`] - Source table schemas
//! - [`transform`] - Join, filter, aggregates, cohorts, export
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing and loading
pub mod loader;
pub mod parser;

// Validation
pub mod validation;

// Dashboard computations
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DashboardError,
    DashboardResult,
    ExportError,
    LoadError,
    QueryError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Dated,
    EnrichedPurchase,
    Event,
    Half,
    Purchase,
    Semester,
    Student,
    YearMonth,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{clamp_top_n, DashboardConfig, SourcePaths};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_csv,
    parse_date,
    parse_datetime,
    CsvError,
    ParseResult,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use loader::{load_dataset, load_table, load_table_file, Dataset, LoadedTable, TableSummary};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate, validate_header};

// =============================================================================
// Re-exports - Dashboard
// =============================================================================

pub use transform::{
    apply_filter,
    available_semesters,
    build_dashboard,
    cohort_analysis,
    date_diagnostics,
    enrich_purchases,
    filter_options,
    semester_label,
    DashboardQuery,
    DashboardReport,
    DatasetKind,
    FilterOptions,
    PeriodFilter,
    SemesterChoice,
};

pub use transform::pipeline;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
