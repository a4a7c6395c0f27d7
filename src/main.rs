//! Command-line entry point for the timecard reconciler.
//!
//! Scheduled runs call `weekly`; operators use the other subcommands for
//! one-off repairs, imports, or to start the HTTP API.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use timecard_reconciler::acquire::CommandAcquirer;
use timecard_reconciler::api::{AppState, create_router};
use timecard_reconciler::config::ConfigLoader;
use timecard_reconciler::identity::{IdentityResolver, import_overrides};
use timecard_reconciler::models::PayPeriod;
use timecard_reconciler::reconcile::{
    Comparison, ReconcileOutcome, Reconciler, ReconcilerSettings, import_targets,
};
use timecard_reconciler::report::{DiscrepancyReport, render_failure_summary, write_report};
use timecard_reconciler::session::RunContext;
use timecard_reconciler::store::FileStore;

#[derive(Debug, Parser)]
#[command(name = "timecard-reconciler", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(
        long,
        global = true,
        env = "TIMECARD_RECONCILER_CONFIG",
        default_value = "config/reconciler.yaml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile one year, backfilling pay periods until the store agrees.
    Reconcile {
        /// Year to reconcile.
        #[arg(long)]
        year: i32,
        /// Run as if today were this date (YYYY-MM-DD).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Compare a year's store totals against a fresh report without writing.
    Compare {
        /// Year to compare.
        #[arg(long)]
        year: i32,
        /// Run as if today were this date (YYYY-MM-DD).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Ingest the pay period that just completed, then reconcile its year.
    Weekly {
        /// Run as if today were this date (YYYY-MM-DD).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Acquire and ingest one date range.
    Ingest {
        /// First day of the range (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the range (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,
    },
    /// Replace the name override table from a CSV.
    ImportNames {
        /// CSV with "Report Name" and "Directory Name" columns.
        csv: PathBuf,
    },
    /// Import yearly targets from a CSV.
    ImportTargets {
        /// CSV with "Person", "Target", "Target2" and optional "Description".
        csv: PathBuf,
        /// Year the targets apply to. Defaults to the current year.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Start the HTTP API.
    Serve,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ConfigLoader::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    info!(
        config = %cli.config.display(),
        "Starting timecard-reconciler v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = run(&loader, cli.command);
    if let Err(err) = &result {
        error!(error = %format!("{:#}", err), "Run failed");
        let summary = render_failure_summary(Utc::now(), &format!("{:#}", err));
        if let Err(write_err) = write_report(&loader.config().output.error_path, &summary) {
            warn!(error = %write_err, "Could not write failure summary");
        }
    }
    result
}

fn run(loader: &ConfigLoader, command: Command) -> Result<()> {
    let config = loader.config();
    match command {
        Command::Reconcile { year, today } => {
            let ctx = run_context(loader, today);
            let mut reconciler = reconciler(loader)?;
            let outcome = reconciler.reconcile_year(&ctx, year)?;
            print_outcome(year, &outcome);
            write_discrepancies(loader, reconciler.store(), outcome.comparison().into_iter())?;
        }
        Command::Compare { year, today } => {
            let ctx = run_context(loader, today);
            let mut reconciler = reconciler(loader)?;
            match reconciler.compare_year(&ctx, year)? {
                Some(comparison) => {
                    println!(
                        "{}: {} of {} employees mismatched",
                        year,
                        comparison.mismatch_count(),
                        comparison.compared
                    );
                    write_discrepancies(loader, reconciler.store(), std::iter::once(&comparison))?;
                }
                None => println!("{}: no completed pay period yet", year),
            }
        }
        Command::Weekly { today } => {
            let ctx = run_context(loader, today);
            let mut reconciler = reconciler(loader)?;
            let outcomes = reconciler.run_weekly(&ctx)?;
            for (year, outcome) in &outcomes {
                print_outcome(*year, outcome);
            }
            write_discrepancies(
                loader,
                reconciler.store(),
                outcomes.iter().filter_map(|(_, outcome)| outcome.comparison()),
            )?;
        }
        Command::Ingest { start, end } => {
            ensure!(start <= end, "start {} is after end {}", start, end);
            let ctx = run_context(loader, None);
            let mut reconciler = reconciler(loader)?;
            let period = PayPeriod::new(start, end);
            let summary = reconciler.ingest_range(&ctx, &period)?;
            println!(
                "{}: wrote week {} of {} for {} employees",
                period, summary.week, summary.year, summary.employees_written
            );
        }
        Command::ImportNames { csv } => {
            let mut store = FileStore::open(&config.store.path)?;
            let file =
                File::open(&csv).with_context(|| format!("opening {}", csv.display()))?;
            let count = import_overrides(&mut store, file)?;
            println!("Imported {} name overrides", count);
        }
        Command::ImportTargets { csv, year } => {
            let now = Local::now().naive_local();
            let year = year.unwrap_or_else(|| now.year());
            let mut store = FileStore::open(&config.store.path)?;
            let resolver = IdentityResolver::from_store(&store)?;
            let file =
                File::open(&csv).with_context(|| format!("opening {}", csv.display()))?;
            let applied = import_targets(&mut store, file, &resolver, year, now)?;
            println!("Imported targets for {} employees ({})", applied, year);
        }
        Command::Serve => serve(loader.clone())?,
    }
    Ok(())
}

fn serve(loader: ConfigLoader) -> Result<()> {
    let bind = loader.config().server.bind.clone();
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let app = create_router(AppState::new(loader));
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("binding {}", bind))?;
        info!("Listening on http://{}", bind);
        axum::serve(listener, app).await?;
        Ok(())
    })
}

fn run_context(loader: &ConfigLoader, today: Option<NaiveDate>) -> RunContext {
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    RunContext::new(today).with_credentials(loader.credentials())
}

fn reconciler(loader: &ConfigLoader) -> Result<Reconciler<CommandAcquirer, FileStore>> {
    let config = loader.config();
    let acquirer = CommandAcquirer::from_config(&config.acquirer, &config.report);
    let store = FileStore::open(&config.store.path)?;
    Ok(Reconciler::new(
        acquirer,
        store,
        ReconcilerSettings::from_config(config),
    ))
}

fn print_outcome(year: i32, outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::NothingToReconcile => {
            println!("{}: no completed pay period yet", year)
        }
        ReconcileOutcome::AlreadyConsistent { .. } => {
            println!("{}: YTD records already match", year)
        }
        ReconcileOutcome::Converged {
            periods_processed, ..
        } => println!(
            "{}: YTD records corrected after {} pay periods",
            year, periods_processed
        ),
        ReconcileOutcome::Backfilled {
            periods_processed,
            remaining_mismatches,
            ..
        } => println!(
            "{}: regenerated all {} pay periods, {} employees still mismatched",
            year, periods_processed, remaining_mismatches
        ),
    }
}

fn write_discrepancies<'a>(
    loader: &ConfigLoader,
    store: &FileStore,
    comparisons: impl Iterator<Item = &'a Comparison>,
) -> Result<()> {
    let resolver = IdentityResolver::from_store(store)?;
    let text: String = comparisons
        .map(|comparison| DiscrepancyReport::new(comparison, &resolver).to_string())
        .collect();
    let path = &loader.config().output.discrepancy_path;
    write_report(path, &text)?;
    info!(path = %path.display(), "Discrepancy report written");
    Ok(())
}
