//! Integration tests for the timecard reconciler.
//!
//! This suite drives the reconciler end to end against a scripted report
//! site and an in-memory store:
//! - Early termination when the store already agrees
//! - Early stop once a periodic check finds agreement
//! - The full walk back to January 1
//! - Week 53 filing and New Year splitting
//! - Name overrides and cancellation
//! - The HTTP API

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use timecard_reconciler::acquire::ReportAcquirer;
use timecard_reconciler::api::{
    AppState, BoxedAcquirer, BoxedStore, CollaboratorFactory, create_router,
};
use timecard_reconciler::config::{ConfigLoader, ReconcilerConfig};
use timecard_reconciler::error::{ReconcileError, ReconcileResult};
use timecard_reconciler::identity::{IdentityResolver, NameOverrideTable};
use timecard_reconciler::models::{EmployeeId, EmployeeWeekRecord, FieldValue, PayPeriod, WeekField};
use timecard_reconciler::reconcile::{ReconcileOutcome, Reconciler, ReconcilerSettings};
use timecard_reconciler::report::DiscrepancyReport;
use timecard_reconciler::session::{CancelFlag, RunContext};
use timecard_reconciler::store::{HoursStore, MemoryStore};

// =============================================================================
// Test Helpers
// =============================================================================

const EMPTY_REPORT: &str = "Person,Project,Hours\n";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn id(s: &str) -> EmployeeId {
    EmployeeId::new(s)
}

/// A report with one row per `(person, project, hours)`.
fn report(rows: &[(&str, &str, &str)]) -> String {
    let mut csv = EMPTY_REPORT.to_string();
    for (person, project, hours) in rows {
        csv.push_str(&format!("\"{}\",{},{}\n", person, project, hours));
    }
    csv
}

/// A record holding Direct hours for the given weeks.
fn direct_weeks(weeks: &[(u32, &str)]) -> EmployeeWeekRecord {
    let mut record = EmployeeWeekRecord::default();
    for (week, hours) in weeks {
        record.set_week(WeekField::direct(*week), decimal(hours));
    }
    record
}

/// Serves canned reports keyed by date range and records every request.
///
/// Ranges without a script get an empty report.
#[derive(Clone, Default)]
struct ScriptedSite {
    reports: Arc<BTreeMap<(NaiveDate, NaiveDate), String>>,
    requests: Arc<Mutex<Vec<PayPeriod>>>,
    cancel_on_request: Option<(usize, CancelFlag)>,
}

impl ScriptedSite {
    fn new(reports: Vec<((NaiveDate, NaiveDate), String)>) -> Self {
        Self {
            reports: Arc::new(reports.into_iter().collect()),
            ..Self::default()
        }
    }

    fn cancel_on_request(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_on_request = Some((n, flag));
        self
    }

    fn requests(&self) -> Vec<PayPeriod> {
        self.requests.lock().unwrap().clone()
    }
}

impl ReportAcquirer for ScriptedSite {
    fn acquire(
        &mut self,
        _ctx: &RunContext,
        period: &PayPeriod,
        destination: &Path,
    ) -> ReconcileResult<PathBuf> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(*period);
            requests.len()
        };
        if let Some((n, flag)) = &self.cancel_on_request {
            if count == *n {
                flag.cancel();
            }
        }
        let csv = self
            .reports
            .get(&(period.start_date, period.end_date))
            .cloned()
            .unwrap_or_else(|| EMPTY_REPORT.to_string());
        fs::create_dir_all(destination).unwrap();
        let path = destination.join("report.csv");
        fs::write(&path, csv).unwrap();
        Ok(path)
    }
}

/// Counts writes on top of a [`MemoryStore`].
struct CountingStore {
    inner: MemoryStore,
    writes: usize,
}

impl CountingStore {
    fn new(inner: MemoryStore) -> Self {
        Self { inner, writes: 0 }
    }
}

impl HoursStore for CountingStore {
    fn get_record(&self, id: &EmployeeId) -> ReconcileResult<Option<EmployeeWeekRecord>> {
        self.inner.get_record(id)
    }

    fn put_field(&mut self, id: &EmployeeId, field: &str, value: FieldValue) -> ReconcileResult<()> {
        self.writes += 1;
        self.inner.put_field(id, field, value)
    }

    fn scan_ids(&self) -> ReconcileResult<BTreeSet<EmployeeId>> {
        self.inner.scan_ids()
    }

    fn override_table(&self) -> ReconcileResult<NameOverrideTable> {
        self.inner.override_table()
    }

    fn put_override_table(&mut self, table: NameOverrideTable) -> ReconcileResult<()> {
        self.writes += 1;
        self.inner.put_override_table(table)
    }
}

fn settings(dir: &Path) -> ReconcilerSettings {
    ReconcilerSettings {
        period_dir: dir.join("Downloads"),
        ytd_dir: dir.join("YTD"),
        ..ReconcilerSettings::default()
    }
}

/// Four pay periods of 2025 as of Monday 2025-01-27:
/// 01-18..01-24 (week 4), 01-11..01-17 (week 3), 01-04..01-10 (week 2)
/// and the short opening period 01-01..01-03 (week 1).
fn january_today() -> NaiveDate {
    date(2025, 1, 27)
}

fn january_ytd() -> (NaiveDate, NaiveDate) {
    (date(2025, 1, 1), date(2025, 1, 24))
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn test_consistent_store_requests_only_the_ytd_report() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![(
        january_ytd(),
        report(&[
            ("Banner, Bruce", "ACME-100", "30"),
            ("Banner, Bruce", "OH_BR-ADMIN", "2"),
        ]),
    )]);
    let mut record = direct_weeks(&[(1, "8"), (2, "8"), (3, "8"), (4, "6")]);
    record.set_week(WeekField::indirect(4), decimal("2"));
    let store = CountingStore::new(MemoryStore::with_records([(id("BruceBanner2025"), record)]));

    let mut reconciler = Reconciler::new(site.clone(), store, settings(dir.path()));
    let outcome = reconciler
        .reconcile_year(&RunContext::new(january_today()), 2025)
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::AlreadyConsistent { .. }));
    assert_eq!(outcome.periods_processed(), 0);
    assert_eq!(site.requests().len(), 1);
    assert_eq!(reconciler.store().writes, 0);
}

#[test]
fn test_backfill_stops_at_first_agreeing_check() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![
        (january_ytd(), report(&[("Banner, Bruce", "ACME-100", "40")])),
        (
            (date(2025, 1, 18), date(2025, 1, 24)),
            report(&[("Banner, Bruce", "ACME-100", "16")]),
        ),
        (
            (date(2025, 1, 11), date(2025, 1, 17)),
            report(&[("Banner, Bruce", "ACME-100", "8")]),
        ),
    ]);
    // Week 4 was never written.
    let store = MemoryStore::with_records([(
        id("BruceBanner2025"),
        direct_weeks(&[(1, "8"), (2, "8"), (3, "8")]),
    )]);

    let mut reconciler = Reconciler::new(site.clone(), store, settings(dir.path()));
    let outcome = reconciler
        .reconcile_year(&RunContext::new(january_today()), 2025)
        .unwrap();

    match &outcome {
        ReconcileOutcome::Converged {
            periods_processed,
            comparison,
        } => {
            assert_eq!(*periods_processed, 2);
            assert!(comparison.is_consistent());
        }
        other => panic!("Expected Converged, got {:?}", other),
    }
    let requests = site.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].start_date, date(2025, 1, 18));
    assert_eq!(requests[2].start_date, date(2025, 1, 11));

    let record = &reconciler.store().records()[&id("BruceBanner2025")];
    assert_eq!(record.week(WeekField::direct(4)), Some(decimal("16")));
}

#[test]
fn test_full_walk_ends_on_opening_period_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    // The report site counts hours the period reports never return.
    let site = ScriptedSite::new(vec![
        (january_ytd(), report(&[("Banner, Bruce", "ACME-100", "48")])),
        (
            (date(2025, 1, 18), date(2025, 1, 24)),
            report(&[("Banner, Bruce", "ACME-100", "16")]),
        ),
        (
            (date(2025, 1, 11), date(2025, 1, 17)),
            report(&[("Banner, Bruce", "ACME-100", "8")]),
        ),
        (
            (date(2025, 1, 4), date(2025, 1, 10)),
            report(&[("Banner, Bruce", "ACME-100", "8")]),
        ),
    ]);
    let store = MemoryStore::with_records([(
        id("BruceBanner2025"),
        direct_weeks(&[(1, "8")]),
    )]);

    let mut reconciler = Reconciler::new(site.clone(), store, settings(dir.path()));
    let outcome = reconciler
        .reconcile_year(&RunContext::new(january_today()), 2025)
        .unwrap();

    match &outcome {
        ReconcileOutcome::Backfilled {
            periods_processed,
            remaining_mismatches,
            ..
        } => {
            assert_eq!(*periods_processed, 4);
            assert_eq!(*remaining_mismatches, 1);
        }
        other => panic!("Expected Backfilled, got {:?}", other),
    }
    assert!(!outcome.is_consistent());

    let opening: Vec<_> = site
        .requests()
        .into_iter()
        .filter(|p| p.start_date == date(2025, 1, 1) && p.end_date == date(2025, 1, 3))
        .collect();
    assert_eq!(opening.len(), 1);
    assert_eq!(site.requests().len(), 5);
    assert_eq!(site.requests().last().unwrap().end_date, date(2025, 1, 3));
}

#[test]
fn test_employee_missing_from_store_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![(
        january_ytd(),
        report(&[
            ("Banner, Bruce", "ACME-100", "8"),
            ("Romanoff, Natasha", "ACME-100", "4"),
        ]),
    )]);
    let store = CountingStore::new(MemoryStore::with_records([(
        id("BruceBanner2025"),
        direct_weeks(&[(1, "8")]),
    )]));

    let mut reconciler = Reconciler::new(site, store, settings(dir.path()));
    let comparison = reconciler
        .compare_year(&RunContext::new(january_today()), 2025)
        .unwrap()
        .unwrap();

    assert_eq!(comparison.compared, 2);
    assert_eq!(comparison.mismatch_count(), 1);
    let resolver = IdentityResolver::from_store(reconciler.store()).unwrap();
    let text = DiscrepancyReport::new(&comparison, &resolver).to_string();
    assert!(text.contains("NOT FOUND IN STORE: Natasha Romanoff (NatashaRomanoff2025)"));
    // compare never writes
    assert_eq!(reconciler.store().writes, 0);
}

#[test]
fn test_name_override_maps_report_name_to_store_name() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![(
        january_ytd(),
        report(&[("Banner, Robert", "ACME-100", "12")]),
    )]);
    let mut store = MemoryStore::with_records([(
        id("BruceBanner2025"),
        direct_weeks(&[(1, "4"), (2, "4"), (3, "4")]),
    )]);
    let mut overrides = NameOverrideTable::new();
    overrides.insert("Robert Banner".to_string(), "Bruce Banner".to_string());
    store.put_override_table(overrides).unwrap();

    let mut reconciler = Reconciler::new(site, store, settings(dir.path()));
    let outcome = reconciler
        .reconcile_year(&RunContext::new(january_today()), 2025)
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::AlreadyConsistent { .. }));
}

#[test]
fn test_cancellation_between_periods_keeps_earlier_writes() {
    let dir = tempfile::tempdir().unwrap();
    let flag = CancelFlag::new();
    let site = ScriptedSite::new(vec![
        (january_ytd(), report(&[("Banner, Bruce", "ACME-100", "40")])),
        (
            (date(2025, 1, 18), date(2025, 1, 24)),
            report(&[("Banner, Bruce", "ACME-100", "16")]),
        ),
    ])
    .cancel_on_request(2, flag.clone());
    let store = MemoryStore::with_records([(
        id("BruceBanner2025"),
        direct_weeks(&[(1, "8")]),
    )]);

    let mut reconciler = Reconciler::new(site.clone(), store, settings(dir.path()));
    let ctx = RunContext::new(january_today()).with_cancel_flag(flag);
    let result = reconciler.reconcile_year(&ctx, 2025);

    assert!(matches!(
        result,
        Err(ReconcileError::Cancelled {
            periods_processed: 1
        })
    ));
    assert_eq!(site.requests().len(), 2);
    let record = &reconciler.store().records()[&id("BruceBanner2025")];
    assert_eq!(record.week(WeekField::direct(4)), Some(decimal("16")));
}

// =============================================================================
// Week numbering and New Year
// =============================================================================

#[test]
fn test_late_december_range_files_as_week_53() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![(
        (date(2025, 12, 27), date(2025, 12, 31)),
        report(&[("Banner, Bruce", "ACME-100", "24")]),
    )]);
    let mut reconciler = Reconciler::new(site, MemoryStore::new(), settings(dir.path()));

    let summary = reconciler
        .ingest_range(
            &RunContext::new(date(2026, 1, 5)),
            &PayPeriod::new(date(2025, 12, 27), date(2025, 12, 31)),
        )
        .unwrap();

    assert_eq!(summary.week, 53);
    assert_eq!(summary.year, 2025);
    let record = &reconciler.store().records()[&id("BruceBanner2025")];
    assert_eq!(record.week(WeekField::direct(53)), Some(decimal("24")));
    assert_eq!(record.week(WeekField::direct(1)), None);
}

#[test]
fn test_weekly_run_splits_period_across_new_year() {
    let dir = tempfile::tempdir().unwrap();
    let site = ScriptedSite::new(vec![
        (
            (date(2025, 12, 27), date(2025, 12, 31)),
            report(&[("Banner, Bruce", "ACME-100", "24")]),
        ),
        (
            (date(2026, 1, 1), date(2026, 1, 2)),
            report(&[("Banner, Bruce", "ACME-100", "16")]),
        ),
        (
            (date(2025, 1, 1), date(2025, 12, 31)),
            report(&[("Banner, Bruce", "ACME-100", "24")]),
        ),
    ]);
    let mut last_year = EmployeeWeekRecord::default();
    last_year.set("Target", FieldValue::Number(decimal("1776")));
    let store = MemoryStore::with_records([(id("BruceBanner2025"), last_year)]);

    let mut reconciler = Reconciler::new(site.clone(), store, settings(dir.path()));
    // Monday 2026-01-05: the last completed period is 2025-12-27..2026-01-02.
    let outcomes = reconciler
        .run_weekly(&RunContext::new(date(2026, 1, 5)))
        .unwrap();

    let years: Vec<i32> = outcomes.iter().map(|(year, _)| *year).collect();
    assert_eq!(years, vec![2025, 2026]);
    assert!(outcomes.iter().all(|(_, outcome)| outcome.is_consistent()));

    let requests = site.requests();
    assert_eq!(
        requests[0],
        PayPeriod::new(date(2025, 12, 27), date(2025, 12, 31))
    );
    assert_eq!(requests[1], PayPeriod::new(date(2026, 1, 1), date(2026, 1, 2)));

    let records = reconciler.store().records();
    assert_eq!(
        records[&id("BruceBanner2025")].week(WeekField::direct(53)),
        Some(decimal("24"))
    );
    let new_year = &records[&id("BruceBanner2026")];
    assert_eq!(new_year.week(WeekField::direct(1)), Some(decimal("16")));
    assert_eq!(new_year.latest_target(), Some(decimal("1776")));
}

// =============================================================================
// HTTP API
// =============================================================================

/// Hands every request the same scripted site and a copy of the seed store.
struct ScriptedCollaborators {
    site: ScriptedSite,
    seed: Vec<(EmployeeId, EmployeeWeekRecord)>,
}

impl CollaboratorFactory for ScriptedCollaborators {
    fn acquirer(&self, _config: &ReconcilerConfig) -> ReconcileResult<BoxedAcquirer> {
        Ok(Box::new(self.site.clone()))
    }

    fn store(&self, _config: &ReconcilerConfig) -> ReconcileResult<BoxedStore> {
        Ok(Box::new(MemoryStore::with_records(self.seed.clone())))
    }
}

fn create_router_for_test(dir: &Path, collaborators: ScriptedCollaborators) -> Router {
    let mut config = ReconcilerConfig::default();
    config.report.period_dir = dir.join("Downloads");
    config.report.ytd_dir = dir.join("YTD");
    create_router(AppState::with_collaborators(
        ConfigLoader::from_config(config),
        collaborators,
    ))
}

fn january_collaborators(stored_week_1: &str) -> ScriptedCollaborators {
    ScriptedCollaborators {
        site: ScriptedSite::new(vec![(
            january_ytd(),
            report(&[("Banner, Bruce", "ACME-100", "8")]),
        )]),
        seed: vec![(id("BruceBanner2025"), direct_weeks(&[(1, stored_week_1)]))],
    }
}

async fn send(router: Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));

    let (status, body) = send(router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reconcile_endpoint_reports_consistent_year() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));
    let body = json!({"year": 2025, "today": "2025-01-27"});

    let (status, body) = send(router, "POST", "/reconcile", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2025);
    assert_eq!(body["outcome"]["status"], "already_consistent");
    assert_eq!(body["discrepancies"], "");
    assert!(body["run_id"].is_string());
}

#[tokio::test]
async fn test_compare_endpoint_renders_discrepancies() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("6"));
    let body = json!({"year": 2025, "today": "2025-01-27"});

    let (status, body) = send(router, "POST", "/compare", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mismatches"], 1);
    assert_eq!(body["comparison"]["mismatches"][0]["kind"], "hours");
    let text = body["discrepancies"].as_str().unwrap();
    assert!(text.contains("HOURS DO NOT MATCH FOR: Bruce Banner"));
}

#[tokio::test]
async fn test_reconcile_endpoint_rejects_future_year() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));
    let body = json!({"year": 2030, "today": "2025-01-27"});

    let (status, body) = send(router, "POST", "/reconcile", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_YEAR");
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));

    let (status, body) =
        send(router, "POST", "/reconcile", Some("{not valid json".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_missing_year_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));

    let (status, body) = send(router, "POST", "/compare", Some("{}".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_ingest_endpoint_rejects_reversed_range() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router_for_test(dir.path(), january_collaborators("8"));
    let body = json!({"start_date": "2025-01-10", "end_date": "2025-01-04"});

    let (status, body) = send(router, "POST", "/ingest", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_ingest_endpoint_writes_week() {
    let dir = tempfile::tempdir().unwrap();
    let collaborators = ScriptedCollaborators {
        site: ScriptedSite::new(vec![(
            (date(2025, 7, 5), date(2025, 7, 11)),
            report(&[("Banner, Bruce", "ACME-100", "40")]),
        )]),
        seed: Vec::new(),
    };
    let router = create_router_for_test(dir.path(), collaborators);
    let body = json!({"start_date": "2025-07-05", "end_date": "2025-07-11"});

    let (status, body) = send(router, "POST", "/ingest", Some(body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["week"], 28);
    assert_eq!(body["summary"]["year"], 2025);
    assert_eq!(body["summary"]["employees_written"], 1);
}
