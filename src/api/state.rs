//! Application state for the reconciler API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::acquire::{CommandAcquirer, ReportAcquirer};
use crate::config::{ConfigLoader, ReconcilerConfig};
use crate::error::ReconcileResult;
use crate::store::{FileStore, HoursStore};

/// Acquirer handed to a run.
pub type BoxedAcquirer = Box<dyn ReportAcquirer + Send>;
/// Store handed to a run.
pub type BoxedStore = Box<dyn HoursStore + Send>;

/// Builds the collaborators for each run.
///
/// A fresh acquirer and store are opened per request so that a run always
/// sees the store as it is on disk.
pub trait CollaboratorFactory: Send + Sync {
    /// The report acquirer for one run.
    fn acquirer(&self, config: &ReconcilerConfig) -> ReconcileResult<BoxedAcquirer>;

    /// The hours store for one run.
    fn store(&self, config: &ReconcilerConfig) -> ReconcileResult<BoxedStore>;
}

/// Opens a [`CommandAcquirer`] and a [`FileStore`] from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredCollaborators;

impl CollaboratorFactory for ConfiguredCollaborators {
    fn acquirer(&self, config: &ReconcilerConfig) -> ReconcileResult<BoxedAcquirer> {
        Ok(Box::new(CommandAcquirer::from_config(
            &config.acquirer,
            &config.report,
        )))
    }

    fn store(&self, config: &ReconcilerConfig) -> ReconcileResult<BoxedStore> {
        Ok(Box::new(FileStore::open(&config.store.path)?))
    }
}

/// Shared application state.
///
/// Holds the loaded configuration, the collaborator factory, and the lock
/// that keeps runs from overlapping.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    collaborators: Arc<dyn CollaboratorFactory>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Creates state that runs against the configured command and store file.
    pub fn new(config: ConfigLoader) -> Self {
        Self::with_collaborators(config, ConfiguredCollaborators)
    }

    /// Creates state with a custom collaborator factory.
    pub fn with_collaborators(
        config: ConfigLoader,
        collaborators: impl CollaboratorFactory + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            collaborators: Arc::new(collaborators),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// The collaborator factory.
    pub fn collaborators(&self) -> Arc<dyn CollaboratorFactory> {
        Arc::clone(&self.collaborators)
    }

    /// Claims the run slot. `None` while another run holds it.
    pub fn try_begin_run(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.run_lock).try_lock_owned().ok()
    }
}
