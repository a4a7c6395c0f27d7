//! HTTP API module for the timecard reconciler.
//!
//! This module provides the REST endpoints that trigger interactive runs:
//! a full reconciliation, a read-only comparison, and a single-range ingest.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{IngestRequest, YearRequest};
pub use response::{
    ApiError, ApiErrorResponse, CompareResponse, IngestResponse, ReconcileResponse,
};
pub use state::{AppState, BoxedAcquirer, BoxedStore, CollaboratorFactory, ConfiguredCollaborators};
