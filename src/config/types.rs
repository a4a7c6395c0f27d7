//! Configuration types for the reconciler.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from the YAML configuration file. Every section has
//! defaults, so a partial file is valid.

use std::path::PathBuf;

use serde::Deserialize;

/// Where reports are downloaded and how long to wait for them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// File name the report generator writes into its destination.
    pub file_name: String,
    /// Directory for single-period reports.
    pub period_dir: PathBuf,
    /// Directory for the full year-to-date report.
    pub ytd_dir: PathBuf,
    /// Base wait in seconds; the acquirer waits at most twice this long.
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_name: "report.csv".to_string(),
            period_dir: PathBuf::from("/tmp/Downloads"),
            ytd_dir: PathBuf::from("/tmp/YTD"),
            timeout_secs: 5,
        }
    }
}

/// The external command that drives the report site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquirerConfig {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments placed before the start date, end date and destination.
    pub args: Vec<String>,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("generate-report"),
            args: Vec::new(),
        }
    }
}

/// Location of the JSON hours store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the store document.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/store.json"),
        }
    }
}

/// Project-code markers that drive hour categorization.
///
/// A project matching an indirect marker counts as Indirect; otherwise a
/// project matching an excluded marker is dropped; everything else is Direct.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    /// Substrings marking indirect (overhead and leave) projects.
    pub indirect_markers: Vec<String>,
    /// Substrings marking projects that count toward neither category.
    pub excluded_markers: Vec<String>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            indirect_markers: vec![
                "OH_BR".to_string(),
                "BEREAVEMENT".to_string(),
                "PARENTAL".to_string(),
            ],
            excluded_markers: vec!["FLEX_TIME".to_string()],
        }
    }
}

/// Tuning for the backfill walk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Re-compare year-to-date totals after this many pay periods.
    pub check_interval: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self { check_interval: 2 }
    }
}

/// Where human-readable output goes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Discrepancy report written after every comparison.
    pub discrepancy_path: PathBuf,
    /// Failure summary written when a run aborts.
    pub error_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            discrepancy_path: PathBuf::from("Discrepancies/discrepancies.txt"),
            error_path: PathBuf::from("Errors/errors.txt"),
        }
    }
}

/// HTTP trigger settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Names of the environment variables holding report site credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Variable holding the username.
    pub username_env: String,
    /// Variable holding the password.
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username_env: "REPORT_SITE_USERNAME".to_string(),
            password_env: "REPORT_SITE_PASSWORD".to_string(),
        }
    }
}

/// The complete reconciler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Report download settings.
    pub report: ReportConfig,
    /// External report generator.
    pub acquirer: AcquirerConfig,
    /// Hours store location.
    pub store: StoreConfig,
    /// Categorization rules.
    pub categories: CategoryRules,
    /// Backfill tuning.
    pub reconcile: ReconcileSettings,
    /// Output sinks.
    pub output: OutputConfig,
    /// HTTP trigger.
    pub server: ServerConfig,
    /// Credential sources.
    pub credentials: CredentialsConfig,
}
