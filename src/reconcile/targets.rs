//! Annual target import.

use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{ReconcileError, ReconcileResult, RowError, RowErrorKind};
use crate::identity::IdentityResolver;
use crate::models::{
    DATE_CHANGED_FIELD, DEFAULT_DESCRIPTION, DESCRIPTION_FIELD, EmployeeKey, FieldValue,
    target_field,
};
use crate::store::HoursStore;

const PERSON_COLUMN: &str = "Person";
const TARGET_COLUMN: &str = "Target";
const TARGET2_COLUMN: &str = "Target2";
const DESCRIPTION_COLUMN: &str = "Description";

/// Timestamp format for `dateChanged2`.
pub const DATE_CHANGED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Imports yearly targets from a CSV with `Person` ("First Last"), `Target`,
/// `Target2` and an optional `Description` column.
///
/// Every row sets `Target`. When `Target2` is present and differs, the row
/// also sets `Target2`, `Description` and `dateChanged2 = now`. Rows with a
/// blank person are skipped; rows with a non-numeric target are logged and
/// skipped. Returns the number of rows applied.
pub fn import_targets<S, R>(
    store: &mut S,
    reader: R,
    resolver: &IdentityResolver,
    year: i32,
    now: NaiveDateTime,
) -> ReconcileResult<usize>
where
    S: HoursStore + ?Sized,
    R: Read,
{
    let format_error = |message: String| ReconcileError::ReportFormat {
        path: "target table".to_string(),
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
    let target_col = required(TARGET_COLUMN)?;
    let target2_col = required(TARGET2_COLUMN)?;
    let description_col = position(DESCRIPTION_COLUMN);

    let mut applied = 0;
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format_error(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);
        let cell = |col: usize| record.get(col).unwrap_or_default();

        let person = cell(person_col);
        if person.is_empty() {
            continue;
        }
        let target = match parse_target(cell(target_col)) {
            Ok(Some(target)) => target,
            Ok(None) => {
                reject(line, RowErrorKind::InvalidTarget { value: String::new() });
                continue;
            }
            Err(kind) => {
                reject(line, kind);
                continue;
            }
        };
        let target2 = match parse_target(cell(target2_col)) {
            Ok(target2) => target2,
            Err(kind) => {
                reject(line, kind);
                continue;
            }
        };

        let Some(key) = EmployeeKey::from_display_name(resolver.resolve(person), year) else {
            reject(
                line,
                RowErrorKind::MalformedName {
                    name: person.to_string(),
                },
            );
            continue;
        };
        let id = key.id();

        store.put_field(&id, &target_field(1), FieldValue::Number(target))?;
        if let Some(target2) = target2.filter(|t2| *t2 != target) {
            let description = description_col
                .map(cell)
                .filter(|d| !d.is_empty())
                .unwrap_or(DEFAULT_DESCRIPTION);
            store.put_field(&id, &target_field(2), FieldValue::Number(target2))?;
            store.put_field(&id, DESCRIPTION_FIELD, description.into())?;
            store.put_field(
                &id,
                DATE_CHANGED_FIELD,
                now.format(DATE_CHANGED_FORMAT).to_string().into(),
            )?;
        }
        applied += 1;
    }

    info!(year, applied, "Targets imported");
    Ok(applied)
}

fn parse_target(cell: &str) -> Result<Option<Decimal>, RowErrorKind> {
    if cell.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(cell)
        .map(Some)
        .map_err(|_| RowErrorKind::InvalidTarget {
            value: cell.to_string(),
        })
}

fn reject(line: u64, kind: RowErrorKind) {
    let error = RowError { line, kind };
    warn!(line, error = %error, "Skipping target row");
}
