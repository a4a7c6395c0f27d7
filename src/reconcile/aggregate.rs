//! Hour aggregation from scraped timecard reports.
//!
//! A report row is one person's hours on one project. Aggregation turns the
//! rows into per-employee Direct and Indirect totals, keyed the way the store
//! keys them.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CategoryRules;
use crate::error::{ReconcileError, ReconcileResult, RowError, RowErrorKind};
use crate::identity::IdentityResolver;
use std::collections::BTreeMap;

use crate::models::{EmployeeId, EmployeeKey, HourCategory, KeyedTotals, YtdTotals};

/// Column holding "Last, First".
pub const PERSON_COLUMN: &str = "Person";
/// Column holding the project code.
pub const PROJECT_COLUMN: &str = "Project";
/// Column holding the hours.
pub const HOURS_COLUMN: &str = "Hours";
const CURRENCY_COLUMN: &str = "TransactionCurrency";
const TIME_TC_COLUMN: &str = "TimeTC";

/// One row of a scraped report, with cells as they appear in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedReportRow {
    /// 1-based line in the source file (the header is line 1).
    pub line: u64,
    /// "Last, First".
    pub person: String,
    /// Project code.
    pub project: String,
    /// Hours cell, unparsed.
    pub hours: String,
    /// Transaction currency, if the report carries it.
    pub currency: Option<String>,
    /// Timecard reference, if the report carries it.
    pub time_tc: Option<String>,
}

impl ScrapedReportRow {
    /// Builds a row from its required cells.
    pub fn new(
        line: u64,
        person: impl Into<String>,
        project: impl Into<String>,
        hours: impl Into<String>,
    ) -> Self {
        Self {
            line,
            person: person.into(),
            project: project.into(),
            hours: hours.into(),
            currency: None,
            time_tc: None,
        }
    }
}

/// Per-employee totals of one report, plus the rows that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedTotals {
    /// Totals by store identifier.
    pub totals: YtdTotals,
    /// The structured identity behind each store identifier.
    pub employees: BTreeMap<EmployeeId, EmployeeKey>,
    /// Rows skipped because of bad data.
    pub rejected: Vec<RowError>,
}

/// Decides which category a project's hours count toward.
///
/// Indirect markers win over excluded markers; `None` means the hours are
/// dropped.
///
/// ```
/// use timecard_reconciler::config::CategoryRules;
/// use timecard_reconciler::models::HourCategory;
/// use timecard_reconciler::reconcile::categorize;
///
/// let rules = CategoryRules::default();
/// assert_eq!(categorize("PRJ-OH_BR-01", &rules), Some(HourCategory::Indirect));
/// assert_eq!(categorize("FLEX_TIME", &rules), None);
/// assert_eq!(categorize("ACME-1001", &rules), Some(HourCategory::Direct));
/// ```
pub fn categorize(project: &str, rules: &CategoryRules) -> Option<HourCategory> {
    if rules
        .indirect_markers
        .iter()
        .any(|marker| project.contains(marker.as_str()))
    {
        Some(HourCategory::Indirect)
    } else if rules
        .excluded_markers
        .iter()
        .any(|marker| project.contains(marker.as_str()))
    {
        None
    } else {
        Some(HourCategory::Direct)
    }
}

/// Reads the rows of a report CSV.
///
/// `source` names the report in errors. A missing required column or a CSV
/// syntax error is a fatal [`ReconcileError::ReportFormat`].
pub fn read_report<R: Read>(reader: R, source: &str) -> ReconcileResult<Vec<ScrapedReportRow>> {
    let format_error = |message: String| ReconcileError::ReportFormat {
        path: source.to_string(),
        message,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers().map_err(|e| format_error(e.to_string()))?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        position(name).ok_or_else(|| format_error(format!("missing column '{}'", name)))
    };
    let person_col = required(PERSON_COLUMN)?;
    let project_col = required(PROJECT_COLUMN)?;
    let hours_col = required(HOURS_COLUMN)?;
    let currency_col = position(CURRENCY_COLUMN);
    let time_tc_col = position(TIME_TC_COLUMN);

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format_error(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);
        let cell = |col: usize| record.get(col).unwrap_or_default().to_string();
        let optional = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        rows.push(ScrapedReportRow {
            line,
            person: cell(person_col),
            project: cell(project_col),
            hours: cell(hours_col),
            currency: optional(currency_col),
            time_tc: optional(time_tc_col),
        });
    }
    debug!(source = %source, rows = rows.len(), "Report read");
    Ok(rows)
}

/// Aggregates an in-memory report.
pub fn aggregate_report<R: Read>(
    reader: R,
    year: i32,
    resolver: &IdentityResolver,
    rules: &CategoryRules,
) -> ReconcileResult<AggregatedTotals> {
    let rows = read_report(reader, "report")?;
    Ok(aggregate_rows(&rows, year, resolver, rules))
}

/// Aggregates a report file.
pub fn aggregate_file(
    path: &Path,
    year: i32,
    resolver: &IdentityResolver,
    rules: &CategoryRules,
) -> ReconcileResult<AggregatedTotals> {
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| ReconcileError::ReportFormat {
        path: source.clone(),
        message: e.to_string(),
    })?;
    let rows = read_report(file, &source)?;
    Ok(aggregate_rows(&rows, year, resolver, rules))
}

/// Totals report rows per employee for `year`.
///
/// Every well-named person appears in the result, even if all of their rows
/// were excluded or had bad hours. Bad rows are logged and collected in
/// [`AggregatedTotals::rejected`]; they never abort aggregation.
///
/// # Example
///
/// ```
/// use timecard_reconciler::config::CategoryRules;
/// use timecard_reconciler::identity::IdentityResolver;
/// use timecard_reconciler::models::EmployeeId;
/// use timecard_reconciler::reconcile::{ScrapedReportRow, aggregate_rows};
/// use rust_decimal::Decimal;
///
/// let rows = vec![
///     ScrapedReportRow::new(2, "Flannery, Lindsay", "ACME-1001", "30"),
///     ScrapedReportRow::new(3, "Flannery, Lindsay", "OH_BR", "10"),
/// ];
/// let result = aggregate_rows(&rows, 2025, &IdentityResolver::default(), &CategoryRules::default());
///
/// let totals = &result.totals[&EmployeeId::new("LindsayFlannery2025")];
/// assert_eq!(totals.direct, Decimal::new(30, 0));
/// assert_eq!(totals.indirect, Decimal::new(10, 0));
/// ```
pub fn aggregate_rows(
    rows: &[ScrapedReportRow],
    year: i32,
    resolver: &IdentityResolver,
    rules: &CategoryRules,
) -> AggregatedTotals {
    let mut result = AggregatedTotals::default();

    for row in rows {
        let key = match employee_key(&row.person, year, resolver) {
            Some(key) => key,
            None => {
                result.reject(
                    row.line,
                    RowErrorKind::MalformedName {
                        name: row.person.clone(),
                    },
                );
                continue;
            }
        };
        let id = key.id();
        result.totals.entry(id.clone()).or_default();
        result.employees.entry(id.clone()).or_insert(key);

        let hours = match parse_hours(&row.hours) {
            Ok(hours) => hours,
            Err(kind) => {
                result.reject(row.line, kind);
                continue;
            }
        };
        if let (Some(category), Some(totals)) =
            (categorize(&row.project, rules), result.totals.get_mut(&id))
        {
            totals.add(category, hours);
        }
    }

    result
}

impl AggregatedTotals {
    /// The totals keyed by [`EmployeeKey`] rather than store identifier.
    pub fn by_employee(&self) -> KeyedTotals {
        self.totals
            .iter()
            .filter_map(|(id, totals)| self.employees.get(id).map(|key| (key.clone(), *totals)))
            .collect()
    }

    fn reject(&mut self, line: u64, kind: RowErrorKind) {
        let error = RowError { line, kind };
        warn!(line = error.line, error = %error.kind, "Skipping report row");
        self.rejected.push(error);
    }
}

/// "Last, First" → resolved [`EmployeeKey`].
///
/// The first name is the first token after the comma, so middle names and
/// initials never reach the key. A multi-word last name is kept whole. An
/// override replaces both parts with the mapped "First Last".
fn employee_key(person: &str, year: i32, resolver: &IdentityResolver) -> Option<EmployeeKey> {
    let (last, first) = person.split_once(',')?;
    let last = last.trim();
    let first = first.split_whitespace().next()?;
    if last.is_empty() {
        return None;
    }
    let display = format!("{} {}", first, last);
    let resolved = resolver.resolve(&display);
    if resolved == display {
        return Some(EmployeeKey::new(first, last, year));
    }
    EmployeeKey::from_display_name(resolved, year)
}

fn parse_hours(cell: &str) -> Result<Decimal, RowErrorKind> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Err(RowErrorKind::MissingHours);
    }
    Decimal::from_str(cell)
        .or_else(|_| Decimal::from_scientific(cell))
        .map_err(|_| RowErrorKind::InvalidHours {
            value: cell.to_string(),
        })
}
