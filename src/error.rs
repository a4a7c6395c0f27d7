//! Error types for the timecard reconciler.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every fatal condition a reconciliation run can hit. Row-level data
//! problems are not errors here: they are collected as [`RowError`]s and the
//! run continues.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the timecard reconciler.
///
/// Every variant is fatal to the current run. Store writes already committed
/// stay committed; each one is an idempotent per-week overwrite, so the run
/// can simply be repeated.
///
/// # Example
///
/// ```
/// use timecard_reconciler::error::ReconcileError;
///
/// let error = ReconcileError::ConfigNotFound {
///     path: "/missing/reconciler.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/reconciler.yaml");
/// ```
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The report site (or the command driving it) failed to produce a report.
    #[error("Report acquisition failed for {start} to {end}: {message}")]
    Acquisition {
        /// First day of the requested range.
        start: NaiveDate,
        /// Last day of the requested range.
        end: NaiveDate,
        /// A description of the failure.
        message: String,
    },

    /// The report file did not appear within the bounded wait.
    #[error("Report not found within {waited_secs} seconds: {path}")]
    AcquisitionTimeout {
        /// The path that was being waited on.
        path: String,
        /// How long the acquirer waited.
        waited_secs: u64,
    },

    /// A report file could not be read as a timecard CSV at all.
    #[error("Unreadable report '{path}': {message}")]
    ReportFormat {
        /// The report path (or a description of the source).
        path: String,
        /// A description of the problem.
        message: String,
    },

    /// Two report names map to the same directory name in the override table.
    #[error(
        "Name override conflict: '{first_source}' and '{second_source}' both map to '{target}'"
    )]
    IdentityConflict {
        /// The directory name claimed twice.
        target: String,
        /// The first report name mapping to it.
        first_source: String,
        /// The second report name mapping to it.
        second_source: String,
    },

    /// A read or write against the hours store failed.
    #[error("Store {operation} failed: {message}")]
    Store {
        /// The store operation that failed (e.g. "put", "scan").
        operation: String,
        /// A description of the failure.
        message: String,
    },

    /// A rendered report could not be written.
    #[error("Failed to write '{path}': {message}")]
    Output {
        /// The destination path.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The requested year has not started yet.
    #[error("Cannot reconcile {year}: it has not started as of {today}")]
    InvalidYear {
        /// The requested year.
        year: i32,
        /// The run date.
        today: NaiveDate,
    },

    /// The caller asked the run to stop between pay periods.
    #[error("Reconciliation cancelled after {periods_processed} pay periods")]
    Cancelled {
        /// Pay periods fully written before the run stopped.
        periods_processed: usize,
    },
}

impl ReconcileError {
    /// Convenience constructor for store failures.
    pub fn store(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        ReconcileError::Store {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// A type alias for Results that return ReconcileError.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// The kind of problem found in a single CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowErrorKind {
    /// The person cell is not in "Last, First" form.
    #[error("malformed name '{name}'")]
    MalformedName {
        /// The offending cell.
        name: String,
    },
    /// The hours cell is empty.
    #[error("missing hours")]
    MissingHours,
    /// The hours cell is not a number.
    #[error("invalid hours '{value}'")]
    InvalidHours {
        /// The offending cell.
        value: String,
    },
    /// A target cell is not a number.
    #[error("invalid target '{value}'")]
    InvalidTarget {
        /// The offending cell.
        value: String,
    },
}

/// A rejected CSV row. Collected, logged, and never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("line {line}: {kind}")]
pub struct RowError {
    /// 1-based line number in the CSV file (the header is line 1).
    pub line: u64,
    /// What was wrong with the row.
    pub kind: RowErrorKind,
}
