//! In-memory hours store.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReconcileResult;
use crate::identity::NameOverrideTable;
use crate::models::{EmployeeId, EmployeeWeekRecord, FieldValue};

use super::HoursStore;

/// An [`HoursStore`] held entirely in memory.
///
/// Used for tests and for embedding the reconciler where persistence is
/// handled by the caller.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<EmployeeId, EmployeeWeekRecord>,
    overrides: NameOverrideTable,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = (EmployeeId, EmployeeWeekRecord)>) -> Self {
        Self {
            records: records.into_iter().collect(),
            ..Self::default()
        }
    }

    /// All records.
    pub fn records(&self) -> &BTreeMap<EmployeeId, EmployeeWeekRecord> {
        &self.records
    }
}

impl HoursStore for MemoryStore {
    fn get_record(&self, id: &EmployeeId) -> ReconcileResult<Option<EmployeeWeekRecord>> {
        Ok(self.records.get(id).cloned())
    }

    fn put_field(
        &mut self,
        id: &EmployeeId,
        field: &str,
        value: FieldValue,
    ) -> ReconcileResult<()> {
        self.records
            .entry(id.clone())
            .or_default()
            .set(field, value);
        Ok(())
    }

    fn scan_ids(&self) -> ReconcileResult<BTreeSet<EmployeeId>> {
        Ok(self.records.keys().cloned().collect())
    }

    fn override_table(&self) -> ReconcileResult<NameOverrideTable> {
        Ok(self.overrides.clone())
    }

    fn put_override_table(&mut self, table: NameOverrideTable) -> ReconcileResult<()> {
        self.overrides = table;
        Ok(())
    }
}
