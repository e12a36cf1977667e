//! REST API types.
//!
//! Every endpoint reads the same query string; each handler picks the
//! parameters it needs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DashboardConfig;
use crate::error::{QueryResult, ServerError};
use crate::loader::{Dataset, TableSummary};
use crate::transform::browser::{parse_field_list, DatasetKind};
use crate::transform::diagnostics::DateDiagnostics;
use crate::transform::filter::PeriodFilter;
use crate::transform::pipeline::DashboardQuery;

/// Shared, read-only server state.
#[derive(Debug)]
pub struct AppState {
    pub dataset: Dataset,
    pub config: DashboardConfig,
}

/// Query string accepted by the dashboard endpoints.
///
/// `mode=semester|date`, `semester`, `from`, `to` (`YYYY-MM-DD`), `top_n`,
/// `dataset=purchases|events|students`, `fields` (comma-separated).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardParams {
    pub mode: Option<String>,
    pub semester: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub top_n: Option<usize>,
    pub dataset: Option<String>,
    pub fields: Option<String>,
}

impl DashboardParams {
    /// Period filter; date bounds default to the purchase date span.
    pub fn filter(&self, dataset: &Dataset) -> QueryResult<PeriodFilter> {
        PeriodFilter::from_params(
            self.mode.as_deref(),
            self.semester.as_deref(),
            self.from.as_deref(),
            self.to.as_deref(),
            dataset.purchase_date_bounds(),
        )
    }

    pub fn query(&self, dataset: &Dataset) -> QueryResult<DashboardQuery> {
        Ok(DashboardQuery::new(self.filter(dataset)?, self.top_n))
    }

    /// Selected table, purchases when absent.
    pub fn dataset_kind(&self) -> QueryResult<DatasetKind> {
        match self.dataset.as_deref() {
            None => Ok(DatasetKind::Purchases),
            Some(raw) => raw.parse(),
        }
    }

    pub fn field_list(&self) -> Vec<String> {
        parse_field_list(self.fields.as_deref())
    }
}

/// Payload of `/api/diagnostics`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub dates: Vec<DateDiagnostics>,
    pub tables: Vec<TableSummary>,
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}
