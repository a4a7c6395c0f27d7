//! JSON-file hours store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::NameOverrideTable;
use crate::models::{EmployeeId, EmployeeWeekRecord, FieldValue};

use super::HoursStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreDocument {
    records: BTreeMap<EmployeeId, EmployeeWeekRecord>,
    overrides: NameOverrideTable,
}

/// An [`HoursStore`] persisted as a single JSON document.
///
/// The whole document is rewritten on every put: it goes to a sibling
/// temporary file first and is then renamed over the original, so a crash
/// mid-write leaves the previous document intact.
///
/// ```text
/// {
///   "records": {
///     "JohnDoe2025": { "Direct3": {"N": "46"}, "Target": {"N": "1824"} }
///   },
///   "overrides": { "Mike Hollar": "Michael Hollar" }
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    document: StoreDocument,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; it is
    /// created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> ReconcileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ReconcileError::store("open", format!("{}: {}", path.display(), e)))?;
            if content.trim().is_empty() {
                StoreDocument::default()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    ReconcileError::store("open", format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            StoreDocument::default()
        };
        debug!(
            path = %path.display(),
            records = document.records.len(),
            "Opened hours store"
        );
        Ok(Self { path, document })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> ReconcileResult<()> {
        let write_error = |e: std::io::Error| {
            ReconcileError::store("write", format!("{}: {}", self.path.display(), e))
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(&self.document)
            .map_err(|e| ReconcileError::store("serialize", e))?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, json).map_err(write_error)?;
        fs::rename(&staging, &self.path).map_err(write_error)?;
        Ok(())
    }
}

impl HoursStore for FileStore {
    fn get_record(&self, id: &EmployeeId) -> ReconcileResult<Option<EmployeeWeekRecord>> {
        Ok(self.document.records.get(id).cloned())
    }

    fn put_field(
        &mut self,
        id: &EmployeeId,
        field: &str,
        value: FieldValue,
    ) -> ReconcileResult<()> {
        let previous = self.document.records.get(id).cloned();
        self.document
            .records
            .entry(id.clone())
            .or_default()
            .set(field, value);
        if let Err(e) = self.persist() {
            // Memory must keep matching the file.
            match previous {
                Some(record) => self.document.records.insert(id.clone(), record),
                None => self.document.records.remove(id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn scan_ids(&self) -> ReconcileResult<BTreeSet<EmployeeId>> {
        Ok(self.document.records.keys().cloned().collect())
    }

    fn override_table(&self) -> ReconcileResult<NameOverrideTable> {
        Ok(self.document.overrides.clone())
    }

    fn put_override_table(&mut self, table: NameOverrideTable) -> ReconcileResult<()> {
        let previous = std::mem::replace(&mut self.document.overrides, table);
        if let Err(e) = self.persist() {
            self.document.overrides = previous;
            return Err(e);
        }
        Ok(())
    }
}
