//! Year-to-date comparison between the scraped report and the store.

use serde::Serialize;

use crate::models::{EmployeeId, HourTotals, YtdTotals};

/// How one employee's totals disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// The report names an employee the store has no record for.
    Missing,
    /// Both sides have the employee but the rounded totals differ.
    Hours {
        /// Totals summed from the store.
        stored: HourTotals,
        /// Totals from the report.
        scraped: HourTotals,
    },
}

/// A mismatch attributed to an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeMismatch {
    /// The store identifier.
    pub employee: EmployeeId,
    /// What disagrees.
    #[serde(flatten)]
    pub mismatch: Mismatch,
}

/// Outcome of comparing scraped totals with stored totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Number of employees looked at (everyone in the report).
    pub compared: usize,
    /// Disagreements in employee id order.
    pub mismatches: Vec<EmployeeMismatch>,
}

impl Comparison {
    /// Number of employees that disagree.
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    /// True when every reported employee agrees with the store.
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compares report totals against store totals.
///
/// Only employees present in `scraped` are checked; store-only employees
/// never count. Both sides are rounded to 2 decimal places first.
///
/// # Example
///
/// ```
/// use timecard_reconciler::models::{EmployeeId, HourTotals, YtdTotals};
/// use timecard_reconciler::reconcile::compare_ytd_totals;
/// use rust_decimal::Decimal;
///
/// let a = EmployeeId::new("AnnaAdams2025");
/// let mut scraped = YtdTotals::new();
/// scraped.insert(a.clone(), HourTotals::new(Decimal::new(45025, 2), Decimal::ZERO));
/// let mut stored = YtdTotals::new();
/// stored.insert(a.clone(), HourTotals::new(Decimal::new(45225, 2), Decimal::ZERO));
///
/// let comparison = compare_ytd_totals(&scraped, &stored);
/// assert_eq!(comparison.mismatch_count(), 1);
/// assert_eq!(comparison.mismatches[0].employee, a);
/// ```
pub fn compare_ytd_totals(scraped: &YtdTotals, stored: &YtdTotals) -> Comparison {
    let mismatches = scraped
        .iter()
        .filter_map(|(employee, scraped_totals)| {
            let mismatch = match stored.get(employee) {
                None => Mismatch::Missing,
                Some(stored_totals) if stored_totals.matches(scraped_totals) => return None,
                Some(stored_totals) => Mismatch::Hours {
                    stored: *stored_totals,
                    scraped: *scraped_totals,
                },
            };
            Some(EmployeeMismatch {
                employee: employee.clone(),
                mismatch,
            })
        })
        .collect();

    Comparison {
        compared: scraped.len(),
        mismatches,
    }
}
