//! Year-to-date reconciliation and backfill.
//!
//! The store is expected to hold, for every employee, the hours of every
//! pay period of the year so far. A fresh full-year report is the ground
//! truth. When the two disagree the reconciler regenerates one pay period at
//! a time, newest first, overwriting the store's week fields, and stops as
//! soon as the totals agree again.

use std::iter::Peekable;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::acquire::ReportAcquirer;
use crate::config::{CategoryRules, ReconcilerConfig};
use crate::error::ReconcileResult;
use crate::identity::IdentityResolver;
use crate::models::{
    BackfillPeriods, PayPeriod, YtdTotals, backfill_periods, current_pay_period, ytd_period_end,
};
use crate::session::RunContext;
use crate::store::{HoursStore, stored_ytd_totals};

use super::aggregate::{AggregatedTotals, aggregate_file};
use super::compare::{Comparison, compare_ytd_totals};
use super::ingest::{IngestSummary, ingest_totals};

/// Directories and rules a reconciler works with.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Download directory for single-period reports.
    pub period_dir: PathBuf,
    /// Download directory for the full-year report.
    pub ytd_dir: PathBuf,
    /// Categorization rules.
    pub categories: CategoryRules,
    /// Compare again after this many backfilled periods.
    pub check_interval: usize,
}

impl ReconcilerSettings {
    /// Extracts the settings from a loaded configuration.
    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self {
            period_dir: config.report.period_dir.clone(),
            ytd_dir: config.report.ytd_dir.clone(),
            categories: config.categories.clone(),
            check_interval: config.reconcile.check_interval,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from_config(&ReconcilerConfig::default())
    }
}

/// How a year reconciliation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// No pay period of the year has completed yet.
    NothingToReconcile,
    /// The store already agreed with the report; nothing was regenerated.
    AlreadyConsistent {
        /// The comparison that found agreement.
        comparison: Comparison,
    },
    /// A periodic check found agreement before reaching January 1.
    Converged {
        /// Pay periods regenerated.
        periods_processed: usize,
        /// The comparison that found agreement.
        comparison: Comparison,
    },
    /// Every period back to January 1 was regenerated.
    Backfilled {
        /// Pay periods regenerated.
        periods_processed: usize,
        /// Employees still disagreeing after the full walk.
        remaining_mismatches: usize,
        /// The final comparison.
        comparison: Comparison,
    },
}

impl ReconcileOutcome {
    /// The last comparison made, if any.
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            ReconcileOutcome::NothingToReconcile => None,
            ReconcileOutcome::AlreadyConsistent { comparison }
            | ReconcileOutcome::Converged { comparison, .. }
            | ReconcileOutcome::Backfilled { comparison, .. } => Some(comparison),
        }
    }

    /// Pay periods regenerated during the run.
    pub fn periods_processed(&self) -> usize {
        match self {
            ReconcileOutcome::NothingToReconcile | ReconcileOutcome::AlreadyConsistent { .. } => 0,
            ReconcileOutcome::Converged {
                periods_processed, ..
            }
            | ReconcileOutcome::Backfilled {
                periods_processed, ..
            } => *periods_processed,
        }
    }

    /// True unless the full walk ended with mismatches left.
    pub fn is_consistent(&self) -> bool {
        self.comparison().is_none_or(Comparison::is_consistent)
    }
}

/// Drives report acquisition and store writes to bring a year's stored
/// totals in line with the report site.
///
/// # Example
///
/// ```no_run
/// use timecard_reconciler::acquire::CommandAcquirer;
/// use timecard_reconciler::config::ConfigLoader;
/// use timecard_reconciler::reconcile::{Reconciler, ReconcilerSettings};
/// use timecard_reconciler::session::RunContext;
/// use timecard_reconciler::store::FileStore;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/reconciler.yaml")?;
/// let config = loader.config();
/// let acquirer = CommandAcquirer::from_config(&config.acquirer, &config.report);
/// let store = FileStore::open(&config.store.path)?;
///
/// let mut reconciler = Reconciler::new(acquirer, store, ReconcilerSettings::from_config(config));
/// let ctx = RunContext::new(NaiveDate::from_ymd_opt(2025, 7, 14).unwrap());
/// let outcome = reconciler.reconcile_year(&ctx, 2025)?;
/// println!("{} periods regenerated", outcome.periods_processed());
/// # Ok::<(), timecard_reconciler::error::ReconcileError>(())
/// ```
#[derive(Debug)]
pub struct Reconciler<A, S> {
    acquirer: A,
    store: S,
    settings: ReconcilerSettings,
}

impl<A: ReportAcquirer, S: HoursStore> Reconciler<A, S> {
    /// Creates a reconciler over an acquirer and a store.
    pub fn new(acquirer: A, store: S, settings: ReconcilerSettings) -> Self {
        Self {
            acquirer,
            store,
            settings,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The underlying acquirer.
    pub fn acquirer(&self) -> &A {
        &self.acquirer
    }

    /// Gives back the acquirer and store.
    pub fn into_parts(self) -> (A, S) {
        (self.acquirer, self.store)
    }

    /// Reconciles `year`, backfilling pay periods until the store agrees
    /// with the report site.
    ///
    /// Acquisition, report and store failures abort the run. Writes made
    /// before the failure stay; each is a full overwrite of one week, so the
    /// run can simply be repeated.
    pub fn reconcile_year(
        &mut self,
        ctx: &RunContext,
        year: i32,
    ) -> ReconcileResult<ReconcileOutcome> {
        info!(correlation_id = %ctx.run_id(), year, "Starting YTD reconciliation");

        let Some(period_end) = ytd_period_end(ctx.today(), year)? else {
            info!(correlation_id = %ctx.run_id(), year, "No completed pay period yet");
            return Ok(ReconcileOutcome::NothingToReconcile);
        };
        let resolver = IdentityResolver::from_store(&self.store)?;
        let scraped = self.scrape_year_to_date(ctx, period_end, year, &resolver)?;

        let comparison = self.compare_with_store(&scraped, year)?;
        if comparison.is_consistent() {
            info!(correlation_id = %ctx.run_id(), year, "YTD records already match");
            return Ok(ReconcileOutcome::AlreadyConsistent { comparison });
        }
        info!(
            correlation_id = %ctx.run_id(),
            year,
            mismatches = comparison.mismatch_count(),
            "YTD mismatch, backfilling pay periods"
        );

        let check_interval = self.settings.check_interval.max(1);
        let mut periods: Peekable<BackfillPeriods> = backfill_periods(period_end).peekable();
        let mut periods_processed = 0;

        while let Some(period) = periods.next() {
            ctx.check_cancelled(periods_processed)?;
            self.ingest_period(ctx, &period, &resolver)?;
            periods_processed += 1;

            if periods_processed % check_interval == 0 && periods.peek().is_some() {
                let comparison = self.compare_with_store(&scraped, year)?;
                debug!(
                    correlation_id = %ctx.run_id(),
                    periods_processed,
                    mismatches = comparison.mismatch_count(),
                    "Backfill check"
                );
                if comparison.is_consistent() {
                    info!(
                        correlation_id = %ctx.run_id(),
                        year,
                        periods_processed,
                        "YTD records corrected"
                    );
                    return Ok(ReconcileOutcome::Converged {
                        periods_processed,
                        comparison,
                    });
                }
            }
        }

        let comparison = self.compare_with_store(&scraped, year)?;
        let remaining_mismatches = comparison.mismatch_count();
        if remaining_mismatches > 0 {
            warn!(
                correlation_id = %ctx.run_id(),
                year,
                periods_processed,
                remaining_mismatches,
                "Backfill reached January 1 with mismatches remaining"
            );
        } else {
            info!(
                correlation_id = %ctx.run_id(),
                year,
                periods_processed,
                "Backfill reached January 1, YTD records corrected"
            );
        }
        Ok(ReconcileOutcome::Backfilled {
            periods_processed,
            remaining_mismatches,
            comparison,
        })
    }

    /// Compares the store with a fresh year-to-date report without writing
    /// anything. `Ok(None)` when no pay period of `year` has completed.
    pub fn compare_year(
        &mut self,
        ctx: &RunContext,
        year: i32,
    ) -> ReconcileResult<Option<Comparison>> {
        let Some(period_end) = ytd_period_end(ctx.today(), year)? else {
            return Ok(None);
        };
        let resolver = IdentityResolver::from_store(&self.store)?;
        let scraped = self.scrape_year_to_date(ctx, period_end, year, &resolver)?;
        let comparison = self.compare_with_store(&scraped, year)?;
        info!(
            correlation_id = %ctx.run_id(),
            year,
            mismatches = comparison.mismatch_count(),
            "YTD comparison complete"
        );
        Ok(Some(comparison))
    }

    /// Acquires and ingests one arbitrary date range. The hours are filed
    /// under the week and year of the range's end date.
    pub fn ingest_range(
        &mut self,
        ctx: &RunContext,
        period: &PayPeriod,
    ) -> ReconcileResult<IngestSummary> {
        let resolver = IdentityResolver::from_store(&self.store)?;
        self.ingest_period(ctx, period, &resolver)
    }

    /// The scheduled run: ingest the pay period that just completed, then
    /// reconcile its year. A period straddling New Year is ingested as two
    /// parts and both years are reconciled, the earlier first.
    pub fn run_weekly(
        &mut self,
        ctx: &RunContext,
    ) -> ReconcileResult<Vec<(i32, ReconcileOutcome)>> {
        let period = current_pay_period(ctx.today());
        let parts = period.split_at_year_end();
        info!(
            correlation_id = %ctx.run_id(),
            period = %period,
            parts = parts.len(),
            "Starting weekly run"
        );

        let resolver = IdentityResolver::from_store(&self.store)?;
        for part in &parts {
            self.ingest_period(ctx, part, &resolver)?;
        }

        let mut outcomes = Vec::with_capacity(parts.len());
        for part in &parts {
            let year = part.year();
            outcomes.push((year, self.reconcile_year(ctx, year)?));
        }
        Ok(outcomes)
    }

    fn scrape_year_to_date(
        &mut self,
        ctx: &RunContext,
        period_end: NaiveDate,
        year: i32,
        resolver: &IdentityResolver,
    ) -> ReconcileResult<YtdTotals> {
        let period = PayPeriod::year_to_date(period_end);
        let report = self
            .acquirer
            .acquire(ctx, &period, &self.settings.ytd_dir)?;
        let aggregated = aggregate_file(&report, year, resolver, &self.settings.categories)?;
        log_rejected(ctx, &period, &aggregated);
        Ok(aggregated.totals)
    }

    fn ingest_period(
        &mut self,
        ctx: &RunContext,
        period: &PayPeriod,
        resolver: &IdentityResolver,
    ) -> ReconcileResult<IngestSummary> {
        let report = self
            .acquirer
            .acquire(ctx, period, &self.settings.period_dir)?;
        let aggregated =
            aggregate_file(&report, period.year(), resolver, &self.settings.categories)?;
        log_rejected(ctx, period, &aggregated);

        let summary = ingest_totals(&mut self.store, &aggregated.by_employee(), period.end_date)?;
        info!(
            correlation_id = %ctx.run_id(),
            period = %period,
            week = summary.week,
            employees = summary.employees_written,
            "Pay period written"
        );
        Ok(summary)
    }

    fn compare_with_store(&self, scraped: &YtdTotals, year: i32) -> ReconcileResult<Comparison> {
        let stored = stored_ytd_totals(&self.store, year)?;
        Ok(compare_ytd_totals(scraped, &stored))
    }
}

fn log_rejected(ctx: &RunContext, period: &PayPeriod, aggregated: &AggregatedTotals) {
    if !aggregated.rejected.is_empty() {
        warn!(
            correlation_id = %ctx.run_id(),
            period = %period,
            rejected = aggregated.rejected.len(),
            "Report rows skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::models::{EmployeeId, HourTotals};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    /// Serves canned CSVs by date range and records every request.
    struct CannedAcquirer {
        reports: BTreeMap<(NaiveDate, NaiveDate), String>,
        requests: Vec<PayPeriod>,
    }

    impl CannedAcquirer {
        fn new() -> Self {
            Self {
                reports: BTreeMap::new(),
                requests: Vec::new(),
            }
        }

        fn with(mut self, start: NaiveDate, end: NaiveDate, csv: &str) -> Self {
            self.reports.insert((start, end), csv.to_string());
            self
        }
    }

    impl ReportAcquirer for CannedAcquirer {
        fn acquire(
            &mut self,
            _ctx: &RunContext,
            period: &PayPeriod,
            destination: &Path,
        ) -> ReconcileResult<PathBuf> {
            self.requests.push(*period);
            let csv = self
                .reports
                .get(&(period.start_date, period.end_date))
                .cloned()
                .unwrap_or_else(|| "Person,Project,Hours\n".to_string());
            fs::create_dir_all(destination).unwrap();
            let path = destination.join("report.csv");
            fs::write(&path, csv).unwrap();
            Ok(path)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn settings(dir: &Path) -> ReconcilerSettings {
        ReconcilerSettings {
            period_dir: dir.join("Downloads"),
            ytd_dir: dir.join("YTD"),
            categories: CategoryRules::default(),
            check_interval: 2,
        }
    }

    #[test]
    fn test_nothing_to_reconcile_before_first_friday() {
        let dir = tempfile::tempdir().unwrap();
        let mut reconciler =
            Reconciler::new(CannedAcquirer::new(), MemoryStore::new(), settings(dir.path()));
        // Yesterday is Thursday 2026-01-01; the nearest Friday is in 2025.
        let ctx = RunContext::new(date(2026, 1, 2));

        let outcome = reconciler.reconcile_year(&ctx, 2026).unwrap();
        assert_eq!(outcome, ReconcileOutcome::NothingToReconcile);
        assert!(reconciler.acquirer().requests.is_empty());
    }

    #[test]
    fn test_future_year_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut reconciler =
            Reconciler::new(CannedAcquirer::new(), MemoryStore::new(), settings(dir.path()));
        let ctx = RunContext::new(date(2025, 7, 14));
        assert!(matches!(
            reconciler.reconcile_year(&ctx, 2026),
            Err(ReconcileError::InvalidYear { year: 2026, .. })
        ));
    }

    #[test]
    fn test_consistent_store_makes_no_period_requests() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = CannedAcquirer::new().with(
            date(2025, 1, 1),
            date(2025, 1, 10),
            "Person,Project,Hours\n\"Banner, Bruce\",ACME,16\n",
        );
        let mut store = MemoryStore::new();
        store
            .put_week_field(
                &EmployeeId::new("BruceBanner2025"),
                crate::models::WeekField::direct(2),
                Decimal::new(16, 0),
            )
            .unwrap();
        let mut reconciler = Reconciler::new(acquirer, store, settings(dir.path()));

        // Monday 2025-01-13: last completed period ends Friday 01-10.
        let outcome = reconciler
            .reconcile_year(&RunContext::new(date(2025, 1, 13)), 2025)
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::AlreadyConsistent { .. }));
        assert_eq!(reconciler.acquirer().requests.len(), 1);
    }

    #[test]
    fn test_cancelled_before_first_period() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = CannedAcquirer::new().with(
            date(2025, 1, 1),
            date(2025, 1, 10),
            "Person,Project,Hours\n\"Banner, Bruce\",ACME,16\n",
        );
        let mut reconciler = Reconciler::new(acquirer, MemoryStore::new(), settings(dir.path()));
        let ctx = RunContext::new(date(2025, 1, 13));
        ctx.cancel_flag().cancel();

        assert!(matches!(
            reconciler.reconcile_year(&ctx, 2025),
            Err(ReconcileError::Cancelled {
                periods_processed: 0
            })
        ));
        assert!(reconciler.store().records().is_empty());
    }

    #[test]
    fn test_short_year_walk_ends_on_january_first() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = CannedAcquirer::new()
            .with(
                date(2025, 1, 1),
                date(2025, 1, 10),
                "Person,Project,Hours\n\"Banner, Bruce\",ACME,16\n\"Banner, Bruce\",OH_BR,8\n",
            )
            .with(
                date(2025, 1, 4),
                date(2025, 1, 10),
                "Person,Project,Hours\n\"Banner, Bruce\",ACME,10\n\"Banner, Bruce\",OH_BR,8\n",
            )
            .with(
                date(2025, 1, 1),
                date(2025, 1, 3),
                "Person,Project,Hours\n\"Banner, Bruce\",ACME,6\n",
            );
        let mut reconciler = Reconciler::new(acquirer, MemoryStore::new(), settings(dir.path()));

        let outcome = reconciler
            .reconcile_year(&RunContext::new(date(2025, 1, 13)), 2025)
            .unwrap();

        // Two periods: no mid-walk check after the last one, then a final
        // comparison.
        match &outcome {
            ReconcileOutcome::Backfilled {
                periods_processed,
                remaining_mismatches,
                ..
            } => {
                assert_eq!(*periods_processed, 2);
                assert_eq!(*remaining_mismatches, 0);
            }
            other => panic!("Expected Backfilled, got {:?}", other),
        }
        let requested: Vec<_> = reconciler.acquirer().requests[1..]
            .iter()
            .map(|p| (p.start_date, p.end_date))
            .collect();
        assert_eq!(
            requested,
            vec![
                (date(2025, 1, 4), date(2025, 1, 10)),
                (date(2025, 1, 1), date(2025, 1, 3)),
            ]
        );
        let stored = stored_ytd_totals(reconciler.store(), 2025).unwrap();
        assert_eq!(
            stored[&EmployeeId::new("BruceBanner2025")],
            HourTotals::new(Decimal::new(16, 0), Decimal::new(8, 0))
        );
    }

    #[test]
    fn test_settings_from_config() {
        let config = ReconcilerConfig::default();
        let settings = ReconcilerSettings::from_config(&config);
        assert_eq!(settings.check_interval, 2);
        assert_eq!(settings.ytd_dir, PathBuf::from("/tmp/YTD"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ReconcileOutcome::NothingToReconcile).unwrap();
        assert_eq!(json["status"], "nothing_to_reconcile");
    }
}
