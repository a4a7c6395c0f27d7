//! Reconciliation logic for the timecard reconciler.
//!
//! This module turns scraped reports into per-employee hour totals, files
//! them into the store week by week, compares year-to-date totals, and runs
//! the backward backfill walk that repairs the store when they disagree.

mod aggregate;
mod backfill;
mod compare;
mod ingest;
mod targets;

pub use aggregate::{
    AggregatedTotals, HOURS_COLUMN, PERSON_COLUMN, PROJECT_COLUMN, ScrapedReportRow,
    aggregate_file, aggregate_report, aggregate_rows, categorize, read_report,
};
pub use backfill::{ReconcileOutcome, Reconciler, ReconcilerSettings};
pub use compare::{Comparison, EmployeeMismatch, Mismatch, compare_ytd_totals};
pub use ingest::{IngestSummary, ingest_totals};
pub use targets::{DATE_CHANGED_FORMAT, import_targets};
