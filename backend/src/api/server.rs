//! HTTP Server for the dashboard API.
//!
//! The dataset is loaded once before the server starts and shared read-only;
//! every request recomputes its answer from it.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                          |
//! |--------|--------------------|--------------------------------------|
//! | GET    | `/health`          | Health check                         |
//! | GET    | `/api/filters`     | Semesters and default date range     |
//! | GET    | `/api/dashboard`   | KPIs, charts, nationalities, cohorts |
//! | GET    | `/api/raw`         | Raw table (capped)                   |
//! | GET    | `/api/export`      | CSV download                         |
//! | GET    | `/api/diagnostics` | Date coverage per table              |
//! | GET    | `/api/logs`        | SSE stream for real-time logs        |

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Method},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{AppState, DashboardParams, DiagnosticsResponse};
use crate::error::{ServerError, ServerResult};
use crate::transform::browser::RawTable;
use crate::transform::diagnostics::date_diagnostics;
use crate::transform::pipeline::{browse, build_dashboard, export, filter_options, DashboardReport, FilterOptions};

type SharedState = Arc<AppState>;

/// Build the router over a loaded dataset.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/filters", get(filters))
        .route("/api/dashboard", get(dashboard))
        .route("/api/raw", get(raw))
        .route("/api/export", get(export_csv))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn start_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let port = state.config.port;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 ESN dashboard server running on http://localhost:{}", port);
    println!("   GET  /api/filters     - Semesters and date range");
    println!("   GET  /api/dashboard   - Dashboard data");
    println!("   GET  /api/raw         - Raw data table");
    println!("   GET  /api/export      - CSV export");
    println!("   GET  /api/diagnostics - Date diagnostics");
    println!("   GET  /api/logs        - SSE log stream");
    println!("   GET  /health          - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Unwrap the query string, turning a malformed one into a JSON 400.
fn params(query: Result<Query<DashboardParams>, QueryRejection>) -> ServerResult<DashboardParams> {
    query
        .map(|Query(p)| p)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "esn-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
        "rows": {
            "students": state.dataset.students.len(),
            "events": state.dataset.events.len(),
            "purchases": state.dataset.purchases.len(),
        }
    }))
}

async fn filters(State(state): State<SharedState>) -> Json<FilterOptions> {
    Json(filter_options(&state.dataset))
}

async fn dashboard(
    State(state): State<SharedState>,
    query: Result<Query<DashboardParams>, QueryRejection>,
) -> ServerResult<Json<DashboardReport>> {
    let query = params(query)?.query(&state.dataset)?;
    Ok(Json(build_dashboard(&state.dataset, &query)))
}

async fn raw(
    State(state): State<SharedState>,
    query: Result<Query<DashboardParams>, QueryRejection>,
) -> ServerResult<Json<RawTable>> {
    let params = params(query)?;
    let table = browse(
        &state.dataset,
        &params.filter(&state.dataset)?,
        params.dataset_kind()?,
        &params.field_list(),
        state.config.max_rows,
    )?;
    Ok(Json(table))
}

async fn export_csv(
    State(state): State<SharedState>,
    query: Result<Query<DashboardParams>, QueryRejection>,
) -> ServerResult<Response> {
    let params = params(query)?;
    let csv = export(
        &state.dataset,
        &params.filter(&state.dataset)?,
        params.dataset_kind()?,
        &params.field_list(),
    )
    .map_err(|e| {
        log_error(format!("Export failed: {}", e));
        e
    })?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", csv.filename),
        ),
    ];
    Ok((headers, csv.content).into_response())
}

async fn diagnostics(State(state): State<SharedState>) -> Json<DiagnosticsResponse> {
    Json(DiagnosticsResponse {
        dates: date_diagnostics(&state.dataset),
        tables: state.dataset.summaries.clone(),
    })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // lagged receivers skip the dropped entries
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
