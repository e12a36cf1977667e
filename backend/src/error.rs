//! Error types for the dashboard pipeline.
//!
//! One enum per layer:
//!
//! - [`LoadError`] - reading, decoding and validating the source tables
//! - [`QueryError`] - bad filter, dataset or field parameters
//! - [`ExportError`] - CSV export failures
//! - [`DashboardError`] - top-level error wrapping the three above
//! - [`ServerError`] - HTTP layer, mapped onto status codes
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading one of the source tables.
///
/// All of these are fatal: a table that fails to load never reaches the
/// joiner, so no partially loaded state is ever served.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("Failed to read {table} file '{path}': {source}")]
    Io {
        table: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV content could not be parsed.
    #[error("Invalid CSV in {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: CsvError,
    },

    /// Header row is missing required columns.
    #[error("{table} table is missing required columns: {errors:?}")]
    Schema {
        table: &'static str,
        errors: Vec<String>,
    },
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors in the parameters of a dashboard, raw-data or export request.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    /// Filter mode is neither `semester` nor `date`.
    #[error("Unknown filter mode '{0}' (expected 'semester' or 'date')")]
    UnknownMode(String),

    /// A date parameter is not `YYYY-MM-DD`.
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Date-range mode without a usable lower or upper bound.
    #[error("Date range needs both 'from' and 'to' and no default range is available")]
    IncompleteRange,

    /// Lower bound after upper bound.
    #[error("Date range is inverted: {from} > {to}")]
    InvertedRange { from: String, to: String },

    /// Dataset selector not recognized.
    #[error("Unknown dataset '{0}' (expected purchases, events or students)")]
    UnknownDataset(String),

    /// Requested fields not present in the selected dataset.
    #[error("Unknown fields for {dataset}: {fields:?}")]
    UnknownFields { dataset: String, fields: Vec<String> },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing a CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the writer failed.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Dashboard Errors (top-level)
// =============================================================================

/// Top-level error for the library entry points.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Source table loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Request parameter error.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<DashboardError> for ServerError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Query(e) => ServerError::BadRequest(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<QueryError> for ServerError {
    fn from(err: QueryError) -> Self {
        ServerError::BadRequest(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for query parsing.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for library entry points.
pub type DashboardResult<T> = Result<T, DashboardError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
