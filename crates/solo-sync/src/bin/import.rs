//! # External Sales Import
//!
//! Imports point-of-sale bills for a date range into the back-office database.
//!
//! ## Usage
//! ```bash
//! # Today's bills, config from the default location
//! cargo run -p solo-sync --bin import
//!
//! # A range, explicit config and database
//! cargo run -p solo-sync --bin import -- --from 2024-03-01 --to 2024-03-07 \
//!     --config ./solo.toml --db ./solo.db
//! ```
//!
//! Ctrl-C stops the import between two bills; bills already recorded stay.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use solo_db::{Database, DbConfig, FsInvoiceStorage};
use solo_sync::{ImportConfig, ImportProgress, Reconciler, RelayClient, SyncResult};

struct Args {
    from: NaiveDate,
    to: NaiveDate,
    config: Option<PathBuf>,
    db: Option<PathBuf>,
}

fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("{} expects a date as YYYY-MM-DD, got '{}'", flag, raw))
}

fn print_help() {
    println!("Solo Back-Office External Sales Import");
    println!();
    println!("Usage: import [OPTIONS]");
    println!();
    println!("Options:");
    println!("      --from <DATE>     First day to import, YYYY-MM-DD (default: today)");
    println!("      --to <DATE>       Last day to import, YYYY-MM-DD (default: --from)");
    println!("  -c, --config <PATH>   Config file (default: platform config dir/solo.toml)");
    println!("  -d, --db <PATH>       Database file, overrides the config");
    println!("  -h, --help            Show this help message");
}

fn parse_args() -> Result<Option<Args>, String> {
    let args: Vec<String> = env::args().collect();
    let today = Utc::now().date_naive();

    let mut from = None;
    let mut to = None;
    let mut config = None;
    let mut db = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        match (flag, value) {
            ("--help" | "-h", _) => {
                print_help();
                return Ok(None);
            }
            ("--from", Some(v)) => from = Some(parse_date(flag, v)?),
            ("--to", Some(v)) => to = Some(parse_date(flag, v)?),
            ("--config" | "-c", Some(v)) => config = Some(PathBuf::from(v)),
            ("--db" | "-d", Some(v)) => db = Some(PathBuf::from(v)),
            (_, None) if flag.starts_with('-') => return Err(format!("{} expects a value", flag)),
            _ => return Err(format!("Unknown argument '{}'", flag)),
        }
        i += 2;
    }

    let from = from.unwrap_or(today);
    Ok(Some(Args {
        from,
        to: to.unwrap_or(from),
        config,
        db,
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("✗ {}", message);
            eprintln!("  Run with --help for usage.");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("✗ {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Returns false when some bills could not be recorded.
async fn run(args: Args) -> SyncResult<bool> {
    let mut config = ImportConfig::load(args.config)?;
    if let Some(db) = args.db {
        config.database.path = db;
    }

    println!("📥 Solo External Sales Import");
    println!("=============================");
    println!("Relay:    {}", config.relay.url);
    println!("Database: {}", config.database.path.display());
    println!("Range:    {} → {}", args.from, args.to);
    println!();

    let db = Database::new(DbConfig::new(config.database.path.clone())).await?;
    let office = db.backoffice(Arc::new(FsInvoiceStorage::new(config.database.invoice_dir.clone())));
    println!("✓ Connected to database");

    let feed = Arc::new(RelayClient::new(&config.relay)?);

    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("⚠ Stopping after the current bill…");
            let _ = cancel_tx.send(true);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            match event {
                ImportProgress::Authenticating => println!("… Signing in to the relay"),
                ImportProgress::FetchedPage { page, lines } => {
                    println!("✓ Page {} ({} lines)", page, lines)
                }
                ImportProgress::Committing { bills } => println!("… Recording {} new bills", bills),
                ImportProgress::BillCommitted { bill_no, done, total } => {
                    println!("  [{}/{}] {}", done, total, bill_no)
                }
            }
        }
    });

    let reconciler = Reconciler::new(feed, &office, &config.relay)
        .with_progress(progress_tx)
        .with_cancel(cancel_rx);
    let outcome = reconciler.run(args.from, args.to).await;
    drop(reconciler);
    let _ = printer.await;
    db.close().await;

    let report = outcome?;
    println!();
    if report.nothing_to_import() {
        println!("✓ Nothing to import for this range");
        return Ok(true);
    }
    println!("  Imported:         {}", report.committed.len());
    println!("  Already imported: {}", report.already_imported);
    println!("  Unknown products: {} lines", report.skipped_unmatched);
    println!("  Invalid lines:    {}", report.skipped_invalid);
    for failure in &report.failures {
        println!("  ✗ Bill {}: {}", failure.bill_no, failure.message);
    }
    if report.cancelled {
        println!("⚠ Import cancelled");
    } else if report.failures.is_empty() {
        println!("✓ Import complete!");
    }

    Ok(report.failures.is_empty())
}
