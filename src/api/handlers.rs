//! HTTP request handlers for the reconciler API.
//!
//! Every run endpoint claims the run lock, then executes the synchronous
//! reconciler on the blocking thread pool.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ReconcileResult;
use crate::identity::IdentityResolver;
use crate::reconcile::{Comparison, Reconciler, ReconcilerSettings};
use crate::report::DiscrepancyReport;
use crate::session::RunContext;

use super::request::{IngestRequest, YearRequest};
use super::response::{
    ApiError, ApiErrorResponse, CompareResponse, IngestResponse, ReconcileResponse,
};
use super::state::{AppState, BoxedAcquirer, BoxedStore};

type ApiReconciler = Reconciler<BoxedAcquirer, BoxedStore>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/reconcile", post(reconcile_handler))
        .route("/compare", post(compare_handler))
        .route("/ingest", post(ingest_handler))
        .with_state(state)
}

/// Handler for GET /health.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handler for POST /reconcile.
///
/// Runs the backfill for one year and returns the outcome together with the
/// rendered discrepancy report.
async fn reconcile_handler(
    State(state): State<AppState>,
    payload: Result<Json<YearRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    let year = request.year;
    let ctx = run_context(&state, request.today, correlation_id);
    info!(correlation_id = %ctx.run_id(), year, "Processing reconcile request");

    let run_id = ctx.run_id();
    let result = run_exclusive(&state, move |reconciler| {
        let outcome = reconciler.reconcile_year(&ctx, year)?;
        let discrepancies = render_discrepancies(reconciler, outcome.comparison())?;
        Ok(ReconcileResponse {
            run_id,
            year,
            outcome,
            discrepancies,
        })
    })
    .await;
    respond(run_id, result)
}

/// Handler for POST /compare.
///
/// Compares the store against a fresh year-to-date report without writing.
async fn compare_handler(
    State(state): State<AppState>,
    payload: Result<Json<YearRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    let year = request.year;
    let ctx = run_context(&state, request.today, correlation_id);
    info!(correlation_id = %ctx.run_id(), year, "Processing compare request");

    let run_id = ctx.run_id();
    let result = run_exclusive(&state, move |reconciler| {
        let comparison = reconciler.compare_year(&ctx, year)?;
        let discrepancies = render_discrepancies(reconciler, comparison.as_ref())?;
        Ok(CompareResponse {
            run_id,
            year,
            mismatches: comparison.as_ref().map_or(0, |c| c.mismatch_count()),
            comparison,
            discrepancies,
        })
    })
    .await;
    respond(run_id, result)
}

/// Handler for POST /ingest.
///
/// Acquires one date range and files it into the store.
async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    let period = match request.period() {
        Ok(period) => period,
        Err(message) => {
            warn!(correlation_id = %correlation_id, error = %message, "Invalid ingest range");
            return ApiErrorResponse::bad_request(ApiError::validation_error(message))
                .into_response();
        }
    };
    let ctx = run_context(&state, None, correlation_id);
    info!(correlation_id = %ctx.run_id(), period = %period, "Processing ingest request");

    let run_id = ctx.run_id();
    let result = run_exclusive(&state, move |reconciler| {
        let summary = reconciler.ingest_range(&ctx, &period)?;
        Ok(IngestResponse {
            run_id,
            period,
            summary,
        })
    })
    .await;
    respond(run_id, result)
}

fn run_context(state: &AppState, today: Option<NaiveDate>, correlation_id: Uuid) -> RunContext {
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    RunContext::with_run_id(correlation_id, today).with_credentials(state.config().credentials())
}

/// Runs `job` against fresh collaborators on the blocking pool while
/// holding the run lock.
async fn run_exclusive<T, F>(state: &AppState, job: F) -> Result<T, ApiErrorResponse>
where
    T: Send + 'static,
    F: FnOnce(&mut ApiReconciler) -> ReconcileResult<T> + Send + 'static,
{
    let guard = state
        .try_begin_run()
        .ok_or_else(ApiErrorResponse::run_in_progress)?;
    let config = state.config().config().clone();
    let collaborators = state.collaborators();

    let handle = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let acquirer = collaborators.acquirer(&config)?;
        let store = collaborators.store(&config)?;
        let mut reconciler =
            Reconciler::new(acquirer, store, ReconcilerSettings::from_config(&config));
        job(&mut reconciler)
    });

    match handle.await {
        Ok(result) => result.map_err(ApiErrorResponse::from),
        Err(join_error) => Err(ApiErrorResponse::internal(format!(
            "Reconciliation task failed: {}",
            join_error
        ))),
    }
}

fn render_discrepancies(
    reconciler: &ApiReconciler,
    comparison: Option<&Comparison>,
) -> ReconcileResult<String> {
    let Some(comparison) = comparison else {
        return Ok(String::new());
    };
    let resolver = IdentityResolver::from_store(reconciler.store())?;
    Ok(DiscrepancyReport::new(comparison, &resolver).to_string())
}

fn respond<T: serde::Serialize>(run_id: Uuid, result: Result<T, ApiErrorResponse>) -> Response {
    match result {
        Ok(body) => {
            info!(correlation_id = %run_id, "Request completed successfully");
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(error) => {
            warn!(
                correlation_id = %run_id,
                code = %error.error.code,
                error = %error.error.message,
                "Request failed"
            );
            error.into_response()
        }
    }
}

fn json_rejection(correlation_id: Uuid, rejection: JsonRejection) -> ApiErrorResponse {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse::bad_request(error)
}
