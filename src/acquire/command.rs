//! Acquirer that shells out to an external report generator.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{AcquirerConfig, ReportConfig};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::PayPeriod;
use crate::session::RunContext;

use super::{POLL_INTERVAL, ReportAcquirer, clear_dir, wait_for_file};

/// Environment variable the generator reads the site username from.
pub const USERNAME_VAR: &str = "REPORT_SITE_USERNAME";
/// Environment variable the generator reads the site password from.
pub const PASSWORD_VAR: &str = "REPORT_SITE_PASSWORD";

/// Runs `program [args..] <start> <end> <destination>` and waits for the
/// generator to drop `file_name` into the destination.
///
/// Dates are passed as `MM/DD/YYYY`. The command and the file wait are each
/// bounded by twice the configured timeout.
#[derive(Debug, Clone)]
pub struct CommandAcquirer {
    program: PathBuf,
    args: Vec<String>,
    file_name: String,
    timeout: Duration,
}

impl CommandAcquirer {
    /// Creates an acquirer.
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        file_name: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            file_name: file_name.into(),
            timeout: Duration::from_secs(timeout_secs.saturating_mul(2)),
        }
    }

    /// Builds an acquirer from the `acquirer` and `report` config sections.
    pub fn from_config(acquirer: &AcquirerConfig, report: &ReportConfig) -> Self {
        Self::new(
            acquirer.program.clone(),
            acquirer.args.clone(),
            report.file_name.clone(),
            report.timeout_secs,
        )
    }

    fn run_generator(
        &self,
        ctx: &RunContext,
        period: &PayPeriod,
        destination: &Path,
    ) -> ReconcileResult<()> {
        let (start, end) = period.site_dates();
        let failure = |message: String| ReconcileError::Acquisition {
            start: period.start_date,
            end: period.end_date,
            message,
        };

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&start)
            .arg(&end)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(credentials) = ctx.credentials() {
            command
                .env(USERNAME_VAR, &credentials.username)
                .env(PASSWORD_VAR, &credentials.password);
        }

        debug!(
            correlation_id = %ctx.run_id(),
            program = %self.program.display(),
            start = %start,
            end = %end,
            "Starting report generator"
        );
        let mut child = command
            .spawn()
            .map_err(|e| failure(format!("cannot start {}: {}", self.program.display(), e)))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(failure(format!("report generator exited with {}", status)));
                }
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ReconcileError::AcquisitionTimeout {
                        path: destination.join(&self.file_name).display().to_string(),
                        waited_secs: self.timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(failure(e.to_string())),
            }
        }
    }
}

impl ReportAcquirer for CommandAcquirer {
    fn acquire(
        &mut self,
        ctx: &RunContext,
        period: &PayPeriod,
        destination: &Path,
    ) -> ReconcileResult<PathBuf> {
        clear_dir(destination, period)?;
        self.run_generator(ctx, period, destination)?;

        let report = destination.join(&self.file_name);
        wait_for_file(&report, self.timeout)?;
        info!(
            correlation_id = %ctx.run_id(),
            period = %period,
            report = %report.display(),
            "Report acquired"
        );
        Ok(report)
    }
}
