//! The per-employee store record.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{HourTotals, WeekField};

/// Field holding the first (original) target.
pub const TARGET_FIELD: &str = "Target";
/// Field describing why the target changed.
pub const DESCRIPTION_FIELD: &str = "Description";
/// Field recording when the superseding target was set.
pub const DATE_CHANGED_FIELD: &str = "dateChanged2";
/// Description used when a superseding target arrives without one.
pub const DEFAULT_DESCRIPTION: &str = "Initial entry";

/// A single attribute value in the key-value store.
///
/// Serialized with the store's type tags: `{"N": "35.2"}` for numbers and
/// `{"S": "text"}` for strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A numeric attribute.
    #[serde(rename = "N")]
    Number(Decimal),
    /// A string attribute.
    #[serde(rename = "S")]
    Text(String),
}

impl FieldValue {
    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Name of the `n`th target field: `Target`, `Target2`, `Target3`, ...
pub fn target_field(n: u32) -> String {
    if n <= 1 {
        TARGET_FIELD.to_string()
    } else {
        format!("{}{}", TARGET_FIELD, n)
    }
}

/// One employee-year row: week hour fields plus target bookkeeping.
///
/// # Example
///
/// ```
/// use timecard_reconciler::models::{EmployeeWeekRecord, WeekField};
/// use rust_decimal::Decimal;
///
/// let mut record = EmployeeWeekRecord::default();
/// record.set_week(WeekField::direct(1), Decimal::new(21, 0));
/// record.set_week(WeekField::direct(2), Decimal::new(515, 1));
/// record.set_week(WeekField::indirect(2), Decimal::new(4, 0));
///
/// let totals = record.year_to_date();
/// assert_eq!(totals.direct, Decimal::new(725, 1));
/// assert_eq!(totals.indirect, Decimal::new(4, 0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeWeekRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl EmployeeWeekRecord {
    /// Wraps a raw field map.
    pub fn from_fields(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    /// All fields of the record.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Looks up a raw field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Sets a raw field.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// The hours stored for one week field, if present and numeric.
    pub fn week(&self, field: WeekField) -> Option<Decimal> {
        self.fields
            .get(&field.to_string())
            .and_then(FieldValue::as_number)
    }

    /// Sets the hours for one week field.
    pub fn set_week(&mut self, field: WeekField, hours: Decimal) {
        self.set(field.to_string(), FieldValue::Number(hours));
    }

    /// Sum of every Direct and Indirect week field on the record.
    pub fn year_to_date(&self) -> HourTotals {
        let mut totals = HourTotals::default();
        for (name, value) in &self.fields {
            if let (Some(field), Some(hours)) = (WeekField::parse(name), value.as_number()) {
                totals.add(field.category, hours);
            }
        }
        totals
    }

    /// The current target: `TargetN` with the highest contiguous `N`.
    ///
    /// ```
    /// use timecard_reconciler::models::{EmployeeWeekRecord, FieldValue};
    /// use rust_decimal::Decimal;
    ///
    /// let mut record = EmployeeWeekRecord::default();
    /// assert_eq!(record.latest_target(), None);
    /// record.set("Target", FieldValue::Number(Decimal::new(1776, 0)));
    /// record.set("Target2", FieldValue::Number(Decimal::new(1860, 0)));
    /// assert_eq!(record.latest_target(), Some(Decimal::new(1860, 0)));
    /// ```
    pub fn latest_target(&self) -> Option<Decimal> {
        let mut latest = None;
        for n in 1.. {
            match self.fields.get(&target_field(n)).and_then(FieldValue::as_number) {
                Some(target) => latest = Some(target),
                None => break,
            }
        }
        latest
    }
}
