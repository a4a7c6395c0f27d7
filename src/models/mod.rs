//! Core data models for the timecard reconciler.
//!
//! This module contains the domain models shared by the aggregator, the
//! reconciler and the store adapters.

mod employee;
mod hours;
mod pay_period;
mod record;

pub use employee::{EmployeeId, EmployeeKey, split_id};
pub use hours::{HourCategory, HourTotals, KeyedTotals, MAX_WEEK, WeekField, YtdTotals, round_hours};
pub use pay_period::{
    BackfillPeriods, PayPeriod, SITE_DATE_FORMAT, backfill_periods, current_pay_period,
    on_or_before, week_number, year_end, year_start, ytd_period_end,
};
pub use record::{
    DATE_CHANGED_FIELD, DEFAULT_DESCRIPTION, DESCRIPTION_FIELD, EmployeeWeekRecord, FieldValue,
    TARGET_FIELD, target_field,
};
