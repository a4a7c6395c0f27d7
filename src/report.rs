//! Human-readable run output.
//!
//! Operators read two things: the discrepancy report listing every employee
//! whose year-to-date totals disagree, and the failure summary sent when a
//! run aborts.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::IdentityResolver;
use crate::models::round_hours;
use crate::reconcile::{Comparison, Mismatch};

const RULE: &str = "------------------------------------------";
const SUMMARY_RULE: &str = "----------------------------------------";

/// Renders a [`Comparison`] as the discrepancy report.
///
/// Store names are shown in the report site's spelling.
///
/// # Example
///
/// ```
/// use timecard_reconciler::identity::IdentityResolver;
/// use timecard_reconciler::models::{EmployeeId, HourTotals, YtdTotals};
/// use timecard_reconciler::reconcile::compare_ytd_totals;
/// use timecard_reconciler::report::DiscrepancyReport;
/// use rust_decimal::Decimal;
///
/// let mut scraped = YtdTotals::new();
/// scraped.insert(EmployeeId::new("AnnaAdams2025"), HourTotals::new(Decimal::new(8, 0), Decimal::ZERO));
/// let comparison = compare_ytd_totals(&scraped, &YtdTotals::new());
///
/// let resolver = IdentityResolver::default();
/// let text = DiscrepancyReport::new(&comparison, &resolver).to_string();
/// assert!(text.starts_with("NOT FOUND IN STORE: Anna Adams (AnnaAdams2025)"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiscrepancyReport<'a> {
    comparison: &'a Comparison,
    resolver: &'a IdentityResolver,
}

impl<'a> DiscrepancyReport<'a> {
    /// Wraps a comparison for rendering.
    pub fn new(comparison: &'a Comparison, resolver: &'a IdentityResolver) -> Self {
        Self {
            comparison,
            resolver,
        }
    }
}

impl fmt::Display for DiscrepancyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.comparison.mismatches {
            let display = entry.employee.display_name();
            let name = self.resolver.to_report_name(&display);
            match &entry.mismatch {
                Mismatch::Missing => {
                    writeln!(f, "NOT FOUND IN STORE: {} ({})", name, entry.employee)?;
                }
                Mismatch::Hours { stored, scraped } => {
                    writeln!(f, "------------HOURS DO NOT MATCH FOR: {}------------", name)?;
                    writeln!(f, "Direct hours from store     : {}", hours(stored.direct))?;
                    writeln!(f, "Indirect hours from store   : {}", hours(stored.indirect))?;
                    writeln!(f, "{}", RULE)?;
                    writeln!(f, "Direct hours from report    : {}", hours(scraped.direct))?;
                    writeln!(f, "Indirect hours from report  : {}", hours(scraped.indirect))?;
                    writeln!(f, "{}", RULE)?;
                }
            }
            writeln!(f)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn hours(value: Decimal) -> Decimal {
    round_hours(value).normalize()
}

/// Renders the notification sent when a run fails.
///
/// ```
/// use timecard_reconciler::report::render_failure_summary;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2025, 7, 14, 6, 0, 0).unwrap();
/// let text = render_failure_summary(at, "Report not found within 10 seconds");
/// assert!(text.contains("Time of Failure: 2025-07-14T06:00:00+00:00"));
/// assert!(text.contains("Error Message: Report not found within 10 seconds"));
/// ```
pub fn render_failure_summary(at: DateTime<Utc>, message: &str) -> String {
    format!(
        "Timecard Reconciliation Error Summary:\n\
         {rule}\n\
         Time of Failure: {at}\n\
         \n\
         Error Message: {message}\n\
         {rule}\n",
        rule = SUMMARY_RULE,
        at = at.to_rfc3339(),
        message = message,
    )
}

/// Writes rendered output to `path`, creating parent directories.
pub fn write_report(path: &Path, text: &str) -> ReconcileResult<()> {
    let output_error = |e: std::io::Error| ReconcileError::Output {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(output_error)?;
    }
    fs::write(path, text).map_err(output_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NameOverrideTable;
    use crate::models::{EmployeeId, HourTotals, YtdTotals};
    use crate::reconcile::compare_ytd_totals;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_hours_block_format() {
        let id = EmployeeId::new("AnnaAdams2025");
        let mut scraped = YtdTotals::new();
        scraped.insert(id.clone(), HourTotals::new(dec("450.25"), dec("35.20")));
        let mut stored = YtdTotals::new();
        stored.insert(id, HourTotals::new(dec("452.25"), dec("35.2")));

        let comparison = compare_ytd_totals(&scraped, &stored);
        let text = DiscrepancyReport::new(&comparison, &IdentityResolver::default()).to_string();

        let expected = "------------HOURS DO NOT MATCH FOR: Anna Adams------------\n\
                        Direct hours from store     : 452.25\n\
                        Indirect hours from store   : 35.2\n\
                        ------------------------------------------\n\
                        Direct hours from report    : 450.25\n\
                        Indirect hours from report  : 35.2\n\
                        ------------------------------------------\n\
                        \n\
                        \n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_names_use_report_spelling() {
        let mut table = NameOverrideTable::new();
        table.insert("Mike Hollar".to_string(), "Michael Hollar".to_string());
        let resolver = IdentityResolver::new(table).unwrap();

        let mut scraped = YtdTotals::new();
        scraped.insert(EmployeeId::new("MichaelHollar2025"), HourTotals::default());
        let comparison = compare_ytd_totals(&scraped, &YtdTotals::new());

        let text = DiscrepancyReport::new(&comparison, &resolver).to_string();
        assert_eq!(text, "NOT FOUND IN STORE: Mike Hollar (MichaelHollar2025)\n\n\n");
    }

    #[test]
    fn test_consistent_comparison_renders_nothing() {
        let comparison = Comparison::default();
        let resolver = IdentityResolver::default();
        assert_eq!(DiscrepancyReport::new(&comparison, &resolver).to_string(), "");
    }

    #[test]
    fn test_failure_summary_layout() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2025, 1, 6, 12, 30, 0).unwrap();
        let text = render_failure_summary(at, "boom");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Timecard Reconciliation Error Summary:");
        assert_eq!(lines[1], SUMMARY_RULE);
        assert_eq!(lines[2], "Time of Failure: 2025-01-06T12:30:00+00:00");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Error Message: boom");
        assert_eq!(lines[5], SUMMARY_RULE);
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Discrepancies").join("discrepancies.txt");
        write_report(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }
}
