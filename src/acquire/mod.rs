//! Report acquisition.
//!
//! Generating a report means driving a third-party site through a browser.
//! The reconciler sees that only as "produce a CSV for this date range in
//! this directory", behind the [`ReportAcquirer`] trait.

mod command;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ReconcileError, ReconcileResult};
use crate::models::PayPeriod;
use crate::session::RunContext;

pub use command::CommandAcquirer;

/// How often to look for the downloaded file.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Produces an hours CSV for a date range.
pub trait ReportAcquirer {
    /// Generates the report for `period` into `destination` and returns the
    /// path of the CSV.
    ///
    /// Any failure, including a report that never appears, is fatal to the
    /// run. There is no retry at this level.
    fn acquire(
        &mut self,
        ctx: &RunContext,
        period: &PayPeriod,
        destination: &Path,
    ) -> ReconcileResult<PathBuf>;
}

impl<T: ReportAcquirer + ?Sized> ReportAcquirer for Box<T> {
    fn acquire(
        &mut self,
        ctx: &RunContext,
        period: &PayPeriod,
        destination: &Path,
    ) -> ReconcileResult<PathBuf> {
        (**self).acquire(ctx, period, destination)
    }
}

/// Removes every file in `dir`, creating the directory if it is missing.
///
/// Stale reports from a previous period must never be picked up as the
/// current one. Failures are reported against `period`.
pub fn clear_dir(dir: &Path, period: &PayPeriod) -> ReconcileResult<()> {
    let io_error = |e: std::io::Error| ReconcileError::Acquisition {
        start: period.start_date,
        end: period.end_date,
        message: format!("cannot prepare download directory {}: {}", dir.display(), e),
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(io_error)?;
        }
    }
    Ok(())
}

/// Polls for `path` until it exists or `timeout` elapses.
pub fn wait_for_file(path: &Path, timeout: Duration) -> ReconcileResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if path.is_file() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ReconcileError::AcquisitionTimeout {
                path: path.display().to_string(),
                waited_secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
