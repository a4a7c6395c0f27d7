//! Name resolution between the report site and the hours store.
//!
//! Some people are named differently in the two systems. An override table
//! maps a report-site "First Last" to the store's "First Last". The table is
//! validated on construction so its inverse is unambiguous.

use std::collections::BTreeMap;
use std::io::Read;

use tracing::{debug, info};

use crate::error::{ReconcileError, ReconcileResult};
use crate::store::HoursStore;

/// Report-site name → store name.
pub type NameOverrideTable = BTreeMap<String, String>;

/// Column holding the report-site spelling in an override CSV.
pub const REPORT_NAME_COLUMN: &str = "Report Name";
/// Column holding the store spelling in an override CSV.
pub const DIRECTORY_NAME_COLUMN: &str = "Directory Name";

/// Resolves display names through a validated override table.
///
/// # Example
///
/// ```
/// use timecard_reconciler::identity::{IdentityResolver, NameOverrideTable};
///
/// let mut table = NameOverrideTable::new();
/// table.insert("Mike Hollar".to_string(), "Michael Hollar".to_string());
/// let resolver = IdentityResolver::new(table)?;
///
/// assert_eq!(resolver.resolve("Mike Hollar"), "Michael Hollar");
/// assert_eq!(resolver.resolve("Lindsay Flannery"), "Lindsay Flannery");
/// assert_eq!(resolver.to_report_name("Michael Hollar"), "Mike Hollar");
/// # Ok::<(), timecard_reconciler::error::ReconcileError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    forward: NameOverrideTable,
    inverse: BTreeMap<String, String>,
}

impl IdentityResolver {
    /// Builds a resolver, rejecting tables where two report names map to the
    /// same store name.
    pub fn new(table: NameOverrideTable) -> ReconcileResult<Self> {
        let mut inverse: BTreeMap<String, String> = BTreeMap::new();
        for (source, target) in &table {
            if let Some(existing) = inverse.insert(target.clone(), source.clone()) {
                return Err(ReconcileError::IdentityConflict {
                    target: target.clone(),
                    first_source: existing,
                    second_source: source.clone(),
                });
            }
        }
        debug!(overrides = table.len(), "Name overrides loaded");
        Ok(Self {
            forward: table,
            inverse,
        })
    }

    /// Loads and validates the override table held by the store.
    pub fn from_store<S: HoursStore + ?Sized>(store: &S) -> ReconcileResult<Self> {
        Self::new(store.override_table()?)
    }

    /// Report-site name → store name. Unmapped names are returned unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.forward.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Store name → report-site name. Unmapped names are returned unchanged.
    pub fn to_report_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.inverse.get(name).map(String::as_str).unwrap_or(name)
    }

    /// The forward table.
    pub fn table(&self) -> &NameOverrideTable {
        &self.forward
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True when there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Parses an override CSV with `Report Name` and `Directory Name` columns.
///
/// Rows with a blank cell in either column are skipped. The result is
/// validated the same way [`IdentityResolver::new`] validates.
pub fn parse_override_csv<R: Read>(reader: R) -> ReconcileResult<NameOverrideTable> {
    let format_error = |message: String| ReconcileError::ReportFormat {
        path: "name override table".to_string(),
        message,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(|e| format_error(e.to_string()))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| format_error(format!("missing column '{}'", name)))
    };
    let report_col = column(REPORT_NAME_COLUMN)?;
    let directory_col = column(DIRECTORY_NAME_COLUMN)?;

    let mut table = NameOverrideTable::new();
    for record in rdr.records() {
        let record = record.map_err(|e| format_error(e.to_string()))?;
        let report_name = record.get(report_col).unwrap_or_default();
        let directory_name = record.get(directory_col).unwrap_or_default();
        if report_name.is_empty() || directory_name.is_empty() {
            continue;
        }
        table.insert(report_name.to_string(), directory_name.to_string());
    }

    IdentityResolver::new(table.clone())?;
    Ok(table)
}

/// Parses an override CSV and replaces the store's override table with it.
pub fn import_overrides<S, R>(store: &mut S, reader: R) -> ReconcileResult<usize>
where
    S: HoursStore + ?Sized,
    R: Read,
{
    let table = parse_override_csv(reader)?;
    let count = table.len();
    store.put_override_table(table)?;
    info!(overrides = count, "Name override table replaced");
    Ok(count)
}
