//! Configuration loading and management for the reconciler.
//!
//! This module loads the reconciler configuration from a YAML file: report
//! download locations and timeouts, the external report generator, the store
//! location, categorization rules and output sinks.
//!
//! # Example
//!
//! ```no_run
//! use timecard_reconciler::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/reconciler.yaml").unwrap();
//! println!("Reports go to {}", loader.config().report.period_dir.display());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AcquirerConfig, CategoryRules, CredentialsConfig, OutputConfig, ReconcileSettings,
    ReconcilerConfig, ReportConfig, ServerConfig, StoreConfig,
};
