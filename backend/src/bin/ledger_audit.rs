//! Find, and optionally repair, half-applied price submissions and retractions.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::Parser;
use gaswatch::config::LedgerSettings;
use gaswatch::domain::{LedgerAuditReport, LedgerAuditService};
use gaswatch::outbound::persistence::{
    DbPool, DieselActivityLogRepository, DieselPriceLedgerRepository, run_pending_migrations,
};
use gaswatch::telemetry::init_tracing;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;

/// `ledger-audit` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ledger-audit",
    about = "Compare the price ledger with activity logs and report orphaned records",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `GASWATCH_DATABASE_URL`, then
    /// `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Retract every orphan found.
    #[arg(long)]
    repair: bool,
    /// Print the report as JSON instead of summary lines.
    #[arg(long)]
    json: bool,
    /// Skip applying pending migrations before the audit.
    #[arg(long = "skip-migrations")]
    skip_migrations: bool,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(error) = init_tracing() {
        warn!(error = %error, "tracing init failed");
    }
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = LedgerSettings::load_from_iter([OsString::from("ledger-audit")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;

    let database_url = resolve_database_url(args.database_url, settings.database_url.clone())?;
    if !args.skip_migrations {
        let url = database_url.clone();
        tokio::task::spawn_blocking(move || run_pending_migrations(&url))
            .await
            .map_err(|error| io::Error::other(format!("migration task failed: {error}")))?
            .map_err(io::Error::other)?;
    }

    let pool = DbPool::new(settings.pool_config(&database_url))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let audit = LedgerAuditService::new(
        Arc::new(DieselPriceLedgerRepository::new(pool.clone())),
        Arc::new(DieselActivityLogRepository::new(pool)),
        Arc::new(DefaultClock),
    )
    .with_grace_period(settings.audit_grace_period());

    let report = audit
        .audit()
        .await
        .map_err(|error| io::Error::other(format!("audit failed: {error}")))?;
    print_report(&report, args.json)?;

    if args.repair && !report.is_consistent() {
        let summary = audit
            .repair(&report)
            .await
            .map_err(|error| io::Error::other(format!("repair failed: {error}")))?;
        println!("prices_retracted={}", summary.prices_retracted);
        println!("log_entries_retracted={}", summary.log_entries_retracted);
        println!("skipped={}", summary.skipped);
    }

    Ok(())
}

fn print_report(report: &LedgerAuditReport, json: bool) -> io::Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report)
            .map_err(|error| io::Error::other(format!("render report: {error}")))?;
        println!("{rendered}");
        return Ok(());
    }
    println!("consistent={}", report.is_consistent());
    println!("recorded_before={}", report.recorded_before.to_rfc3339());
    println!("orphaned_prices={}", report.orphaned_prices.len());
    for orphan in &report.orphaned_prices {
        println!(
            "  price correlation_id={} station_id={} branch={} user_id={}",
            orphan.correlation_id, orphan.station_id, orphan.branch, orphan.user_id
        );
    }
    println!("orphaned_log_entries={}", report.orphaned_log_entries.len());
    for orphan in &report.orphaned_log_entries {
        println!(
            "  log correlation_id={} station_id={} branch={} user_id={}",
            orphan.correlation_id, orphan.station_id, orphan.branch, orphan.user_id
        );
    }
    Ok(())
}

fn non_empty(value: String, source: &str) -> io::Result<String> {
    if value.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{source} must not be empty"),
        ));
    }
    Ok(value)
}

fn resolve_database_url(explicit: Option<String>, configured: Option<String>) -> io::Result<String> {
    if let Some(value) = explicit {
        return non_empty(value, "--database-url");
    }
    if let Some(value) = configured {
        return non_empty(value, "GASWATCH_DATABASE_URL");
    }
    let from_env = env::var("DATABASE_URL").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "database URL missing: set --database-url, GASWATCH_DATABASE_URL or DATABASE_URL",
        )
    })?;
    non_empty(from_env, "DATABASE_URL")
}
