//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the reconciler
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{ReconcileError, ReconcileResult};
use crate::session::Credentials;

use super::types::ReconcilerConfig;

/// Loads and provides access to the reconciler configuration.
///
/// # File Layout
///
/// ```text
/// report:
///   file_name: report.csv
///   period_dir: /tmp/Downloads
///   ytd_dir: /tmp/YTD
///   timeout_secs: 5
/// acquirer:
///   program: ./scripts/generate-report
/// store:
///   path: data/store.json
/// categories:
///   indirect_markers: [OH_BR, BEREAVEMENT, PARENTAL]
///   excluded_markers: [FLEX_TIME]
/// reconcile:
///   check_interval: 2
/// ```
///
/// # Example
///
/// ```no_run
/// use timecard_reconciler::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/reconciler.yaml")?;
/// println!("Store: {}", loader.config().store.path.display());
/// # Ok::<(), timecard_reconciler::error::ReconcileError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: ReconcilerConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if the file is
    /// missing ([`ReconcileError::ConfigNotFound`]) or is not valid YAML for
    /// the configuration schema ([`ReconcileError::ConfigParseError`]).
    pub fn load<P: AsRef<Path>>(path: P) -> ReconcileResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| ReconcileError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config = Self::parse(&content).map_err(|message| ReconcileError::ConfigParseError {
            path: path_str,
            message,
        })?;

        Ok(Self { config })
    }

    /// Builds a loader around an already-constructed configuration.
    pub fn from_config(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    fn parse(content: &str) -> Result<ReconcilerConfig, String> {
        // An empty document is valid and means "all defaults".
        if content.trim().is_empty() {
            return Ok(ReconcilerConfig::default());
        }
        let config: ReconcilerConfig =
            serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if config.reconcile.check_interval == 0 {
            return Err("reconcile.check_interval must be at least 1".to_string());
        }
        Ok(config)
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reads report site credentials from the configured environment
    /// variables.
    pub fn credentials(&self) -> Option<Credentials> {
        let names = &self.config.credentials;
        Credentials::from_env(&names.username_env, &names.password_env)
    }
}
