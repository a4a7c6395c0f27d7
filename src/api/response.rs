//! Response types for the reconciler API.
//!
//! This module defines the success bodies, the error body, and the mapping
//! from [`ReconcileError`] to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::models::PayPeriod;
use crate::reconcile::{Comparison, IngestSummary, ReconcileOutcome};

/// Body of a successful `POST /reconcile`.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// The reconciled year.
    pub year: i32,
    /// How the run ended.
    pub outcome: ReconcileOutcome,
    /// Rendered discrepancy report; empty when consistent.
    pub discrepancies: String,
}

/// Body of a successful `POST /compare`.
#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// The compared year.
    pub year: i32,
    /// Employees that disagree.
    pub mismatches: usize,
    /// The comparison; `None` when no pay period has completed yet.
    pub comparison: Option<Comparison>,
    /// Rendered discrepancy report.
    pub discrepancies: String,
}

/// Body of a successful `POST /ingest`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// The ingested range.
    pub period: PayPeriod,
    /// What was written.
    pub summary: IngestSummary,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// 400 with a validation error body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }

    /// 409 returned while another run holds the run lock.
    pub fn run_in_progress() -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: ApiError::with_details(
                "RUN_IN_PROGRESS",
                "A reconciliation run is already in progress",
                "Retry once the current run has finished",
            ),
        }
    }

    /// 500 for failures outside the reconciler itself.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new("INTERNAL_ERROR", message),
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<ReconcileError> for ApiErrorResponse {
    fn from(error: ReconcileError) -> Self {
        let message = error.to_string();
        let (status, code) = match &error {
            ReconcileError::ConfigNotFound { .. } | ReconcileError::ConfigParseError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            ReconcileError::Acquisition { .. } => (StatusCode::BAD_GATEWAY, "ACQUISITION_FAILED"),
            ReconcileError::AcquisitionTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "ACQUISITION_TIMEOUT")
            }
            ReconcileError::ReportFormat { .. } => (StatusCode::BAD_GATEWAY, "REPORT_FORMAT"),
            ReconcileError::IdentityConflict { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "IDENTITY_CONFLICT")
            }
            ReconcileError::Store { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            ReconcileError::Output { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "OUTPUT_ERROR"),
            ReconcileError::InvalidYear { .. } => (StatusCode::BAD_REQUEST, "INVALID_YEAR"),
            ReconcileError::Cancelled { .. } => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
        };
        let details = match &error {
            ReconcileError::Store { .. }
            | ReconcileError::Acquisition { .. }
            | ReconcileError::AcquisitionTimeout { .. } => {
                Some("Writes made before the failure are kept; the run can be repeated".to_string())
            }
            _ => None,
        };
        ApiErrorResponse {
            status,
            error: ApiError {
                code: code.to_string(),
                message,
                details,
            },
        }
    }
}
