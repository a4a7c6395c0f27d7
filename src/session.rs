//! Per-run context.
//!
//! Everything a single reconciliation run needs to share with its
//! collaborators lives in a [`RunContext`] that is created at the start of
//! the run and dropped at the end.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};

/// Login for the report site.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Report site username.
    pub username: String,
    /// Report site password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from two environment variables. Returns `None`
    /// unless both are set.
    pub fn from_env(username_var: &str, password_var: &str) -> Option<Self> {
        let username = std::env::var(username_var).ok()?;
        let password = std::env::var(password_var).ok()?;
        Some(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Shared flag a caller sets to stop a run between pay periods.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context for one reconciliation run.
///
/// # Example
///
/// ```
/// use timecard_reconciler::session::RunContext;
/// use chrono::NaiveDate;
///
/// let ctx = RunContext::new(NaiveDate::from_ymd_opt(2025, 7, 14).unwrap());
/// assert!(ctx.check_cancelled(0).is_ok());
/// ctx.cancel_flag().cancel();
/// assert!(ctx.check_cancelled(0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    today: NaiveDate,
    credentials: Option<Credentials>,
    cancel: CancelFlag,
}

impl RunContext {
    /// Creates a context for a run happening on `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            today,
            credentials: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Creates a context with a caller-chosen run id, so a request's
    /// correlation id carries through to the run's log lines.
    pub fn with_run_id(run_id: Uuid, today: NaiveDate) -> Self {
        Self {
            run_id,
            ..Self::new(today)
        }
    }

    /// Attaches report site credentials.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Uses a caller-owned cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Unique id for correlating this run's log lines.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The date the run treats as today.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Report site credentials, if any were supplied.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The run's cancellation flag.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Fails with [`ReconcileError::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self, periods_processed: usize) -> ReconcileResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled { periods_processed });
        }
        Ok(())
    }
}
