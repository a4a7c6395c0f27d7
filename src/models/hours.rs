//! Hour totals and week field names.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EmployeeId, EmployeeKey};

/// Highest week number a record can hold. Week 53 is the trailing partial
/// week at the end of December.
pub const MAX_WEEK: u32 = 53;

/// Rounds hours to the 2-decimal precision used for storage and comparison.
pub fn round_hours(hours: Decimal) -> Decimal {
    hours.round_dp(2)
}

/// The accounting category of a block of hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourCategory {
    /// Billable project work.
    Direct,
    /// Overhead, bereavement, parental leave and the like.
    Indirect,
}

impl fmt::Display for HourCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HourCategory::Direct => write!(f, "Direct"),
            HourCategory::Indirect => write!(f, "Indirect"),
        }
    }
}

/// Direct and indirect hours for one employee over some range.
///
/// # Example
///
/// ```
/// use timecard_reconciler::models::{HourCategory, HourTotals};
/// use rust_decimal::Decimal;
///
/// let mut totals = HourTotals::default();
/// totals.add(HourCategory::Direct, Decimal::new(45025, 2));
/// totals.add(HourCategory::Indirect, Decimal::new(352, 1));
/// assert_eq!(totals.direct, Decimal::new(45025, 2));
/// assert_eq!(totals.indirect, Decimal::new(352, 1));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourTotals {
    /// Direct hours.
    pub direct: Decimal,
    /// Indirect hours.
    pub indirect: Decimal,
}

impl HourTotals {
    /// Creates totals from both categories.
    pub fn new(direct: Decimal, indirect: Decimal) -> Self {
        Self { direct, indirect }
    }

    /// Adds hours to one category.
    pub fn add(&mut self, category: HourCategory, hours: Decimal) {
        match category {
            HourCategory::Direct => self.direct += hours,
            HourCategory::Indirect => self.indirect += hours,
        }
    }

    /// Both categories rounded to 2 decimal places.
    pub fn rounded(&self) -> Self {
        Self {
            direct: round_hours(self.direct),
            indirect: round_hours(self.indirect),
        }
    }

    /// True when both categories agree at 2-decimal precision.
    pub fn matches(&self, other: &HourTotals) -> bool {
        self.rounded() == other.rounded()
    }
}

/// Per-employee hour totals keyed by store identifier.
pub type YtdTotals = BTreeMap<EmployeeId, HourTotals>;

/// Per-employee hour totals keyed by structured identity.
pub type KeyedTotals = BTreeMap<EmployeeKey, HourTotals>;

/// A per-week hour field on an employee record.
///
/// Displays as the store field name, e.g. `Direct12` or `Indirect53`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekField {
    /// Which category the field holds.
    pub category: HourCategory,
    /// The week number, 1..=53.
    pub week: u32,
}

impl WeekField {
    /// The Direct field for a week.
    pub fn direct(week: u32) -> Self {
        Self {
            category: HourCategory::Direct,
            week,
        }
    }

    /// The Indirect field for a week.
    pub fn indirect(week: u32) -> Self {
        Self {
            category: HourCategory::Indirect,
            week,
        }
    }

    /// Parses a store field name such as `Direct7`.
    ///
    /// ```
    /// use timecard_reconciler::models::{HourCategory, WeekField};
    ///
    /// let field = WeekField::parse("Indirect53").unwrap();
    /// assert_eq!(field.category, HourCategory::Indirect);
    /// assert_eq!(field.week, 53);
    /// assert!(WeekField::parse("Direct54").is_none());
    /// assert!(WeekField::parse("Target2").is_none());
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let (category, week) = if let Some(rest) = name.strip_prefix("Indirect") {
            (HourCategory::Indirect, rest)
        } else if let Some(rest) = name.strip_prefix("Direct") {
            (HourCategory::Direct, rest)
        } else {
            return None;
        };
        if week.is_empty() || !week.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let week: u32 = week.parse().ok()?;
        (1..=MAX_WEEK)
            .contains(&week)
            .then_some(Self { category, week })
    }
}

impl fmt::Display for WeekField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.category, self.week)
    }
}
