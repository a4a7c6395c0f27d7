//! The hours store boundary.
//!
//! The reconciler talks to the durable key-value store only through the
//! [`HoursStore`] trait. Records are keyed by [`EmployeeId`]; this is the
//! only place the structured [`EmployeeKey`](crate::models::EmployeeKey)
//! appears in its serialized form.

mod file;
mod memory;

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::error::ReconcileResult;
use crate::identity::NameOverrideTable;
use crate::models::{EmployeeId, EmployeeWeekRecord, FieldValue, WeekField, YtdTotals};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Per-employee week and target storage.
pub trait HoursStore {
    /// Reads a whole record. `Ok(None)` when the id has never been written.
    fn get_record(&self, id: &EmployeeId) -> ReconcileResult<Option<EmployeeWeekRecord>>;

    /// Writes one field, creating the record if needed.
    fn put_field(&mut self, id: &EmployeeId, field: &str, value: FieldValue)
    -> ReconcileResult<()>;

    /// Every employee id in the store.
    fn scan_ids(&self) -> ReconcileResult<BTreeSet<EmployeeId>>;

    /// The name override table.
    fn override_table(&self) -> ReconcileResult<NameOverrideTable>;

    /// Replaces the name override table.
    fn put_override_table(&mut self, table: NameOverrideTable) -> ReconcileResult<()>;

    /// Reads one field.
    fn get_field(&self, id: &EmployeeId, field: &str) -> ReconcileResult<Option<FieldValue>> {
        Ok(self
            .get_record(id)?
            .and_then(|record| record.get(field).cloned()))
    }

    /// Reads one week field as hours.
    fn get_week_field(&self, id: &EmployeeId, field: WeekField) -> ReconcileResult<Option<Decimal>> {
        Ok(self
            .get_field(id, &field.to_string())?
            .and_then(|value| value.as_number()))
    }

    /// Writes one week field.
    fn put_week_field(
        &mut self,
        id: &EmployeeId,
        field: WeekField,
        hours: Decimal,
    ) -> ReconcileResult<()> {
        self.put_field(id, &field.to_string(), FieldValue::Number(hours))
    }
}

impl<T: HoursStore + ?Sized> HoursStore for Box<T> {
    fn get_record(&self, id: &EmployeeId) -> ReconcileResult<Option<EmployeeWeekRecord>> {
        (**self).get_record(id)
    }

    fn put_field(
        &mut self,
        id: &EmployeeId,
        field: &str,
        value: FieldValue,
    ) -> ReconcileResult<()> {
        (**self).put_field(id, field, value)
    }

    fn scan_ids(&self) -> ReconcileResult<BTreeSet<EmployeeId>> {
        (**self).scan_ids()
    }

    fn override_table(&self) -> ReconcileResult<NameOverrideTable> {
        (**self).override_table()
    }

    fn put_override_table(&mut self, table: NameOverrideTable) -> ReconcileResult<()> {
        (**self).put_override_table(table)
    }
}

/// Sums every week field of every `year` record into year-to-date totals.
///
/// Ids without a trailing year, or with a different year, are skipped.
pub fn stored_ytd_totals<S: HoursStore + ?Sized>(store: &S, year: i32) -> ReconcileResult<YtdTotals> {
    let mut totals = YtdTotals::new();
    for id in store.scan_ids()? {
        match id.year() {
            Some(y) if y == year => {}
            Some(_) => continue,
            None => {
                tracing::warn!(employee = %id, "Skipping store record without a year suffix");
                continue;
            }
        }
        if let Some(record) = store.get_record(&id)? {
            totals.insert(id, record.year_to_date());
        }
    }
    Ok(totals)
}
