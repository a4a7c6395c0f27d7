//! Writing one pay period's totals into the store.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ReconcileResult;
use crate::models::{
    EmployeeKey, FieldValue, HourCategory, KeyedTotals, TARGET_FIELD, WeekField, round_hours,
    week_number,
};
use crate::store::HoursStore;

/// What an ingest wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Week the hours were filed under.
    pub week: u32,
    /// Year the hours were filed under.
    pub year: i32,
    /// Employees whose week fields were written.
    pub employees_written: usize,
    /// New records that inherited last year's target.
    pub targets_carried: usize,
    /// Week fields that already held non-zero hours.
    pub overwritten: usize,
}

/// Files `totals` under the week and year of `period_end`.
///
/// Each employee's `Direct{w}` and `Indirect{w}` are overwritten with the
/// rounded totals. A record created by this ingest inherits the latest
/// target from the same person's previous-year record, when there is one.
/// Re-ingesting the same totals leaves the store unchanged.
pub fn ingest_totals<S: HoursStore + ?Sized>(
    store: &mut S,
    totals: &KeyedTotals,
    period_end: NaiveDate,
) -> ReconcileResult<IngestSummary> {
    let week = week_number(period_end);
    let year = period_end.year();
    let mut summary = IngestSummary {
        week,
        year,
        ..IngestSummary::default()
    };

    for (employee, hours) in totals {
        let key = employee.for_year(year);
        let id = key.id();
        let existing = store.get_record(&id)?;

        if existing.is_none() && carry_forward_target(store, &key)? {
            summary.targets_carried += 1;
        }

        for (category, value) in [
            (HourCategory::Direct, hours.direct),
            (HourCategory::Indirect, hours.indirect),
        ] {
            let field = WeekField { category, week };
            let previous = existing.as_ref().and_then(|record| record.week(field));
            if previous.is_some_and(|p| p > Decimal::ZERO) {
                info!(employee = %id, week, field = %field, "Overwriting existing hours");
                summary.overwritten += 1;
            }
            store.put_week_field(&id, field, round_hours(value))?;
        }
        summary.employees_written += 1;
    }

    debug!(
        week,
        year,
        employees = summary.employees_written,
        "Period ingested"
    );
    Ok(summary)
}

fn carry_forward_target<S: HoursStore + ?Sized>(
    store: &mut S,
    key: &EmployeeKey,
) -> ReconcileResult<bool> {
    let previous = store.get_record(&key.for_year(key.year - 1).id())?;
    match previous.and_then(|record| record.latest_target()) {
        Some(target) => {
            let id = key.id();
            store.put_field(&id, TARGET_FIELD, FieldValue::Number(target))?;
            info!(employee = %id, target = %target, "Carried target forward from previous year");
            Ok(true)
        }
        None => Ok(false),
    }
}
