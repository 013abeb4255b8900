//! Offline settings tool for the expiry reminder bot.
//!
//! Exports, imports and checks the user and config documents without a
//! running bot.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use expiry_reminder_bot::clock::SystemClock;
use expiry_reminder_bot::plugin::settings::{SettingsUpdate, apply, snapshot};
use expiry_reminder_bot::store::persist::read_json;
use expiry_reminder_bot::store::{RecordStore, StoreError, UserMap};

/// Expiry reminder settings tool.
#[derive(Parser, Debug)]
#[command(name = "expiry_settings")]
#[command(about = "Export, import and check expiry bot data documents")]
#[command(version)]
struct Args {
    /// Directory holding users.json and config.json.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print both documents and user statistics as JSON.
    Export,

    /// Replace documents from files.
    Import {
        /// Users document to import.
        #[arg(long)]
        users: Option<PathBuf>,

        /// Config document to import.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Report user records whose dates cannot be parsed.
    Check {
        /// Show every record, not just problems.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let read_only = matches!(args.command, Command::Export | Command::Check { .. });
    let store = match open_store(&args.data_dir, read_only) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Export => export(&store),
        Command::Import { users, config } => import(&store, users.as_deref(), config.as_deref()),
        Command::Check { verbose } => check(&store, verbose),
    }
}

/// Opens the store. Read-only commands never create a missing directory.
fn open_store(data_dir: &Path, read_only: bool) -> Result<RecordStore, String> {
    if read_only && !data_dir.is_dir() {
        return Err(format!("Data directory not found: {}", data_dir.display()));
    }
    RecordStore::open(data_dir, Arc::new(SystemClock))
        .map_err(|e| format!("Failed to open data directory: {e}"))
}

fn export(store: &RecordStore) -> ExitCode {
    match serde_json::to_string_pretty(&snapshot(store)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to serialize settings: {e}");
            ExitCode::FAILURE
        }
    }
}

fn import(store: &RecordStore, users: Option<&Path>, config: Option<&Path>) -> ExitCode {
    if users.is_none() && config.is_none() {
        eprintln!("✗ Nothing to import: pass --users and/or --config");
        return ExitCode::FAILURE;
    }

    let users_json = match users.map(std::fs::read_to_string).transpose() {
        Ok(content) => content,
        Err(e) => {
            eprintln!("✗ Failed to read users file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match config.map(read_value).transpose() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("✗ Failed to read config file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (outcome, _) = apply(store, SettingsUpdate { users_json, config });
    if outcome.success {
        println!("✓ {}", outcome.message);
        ExitCode::SUCCESS
    } else {
        eprintln!("✗ {}", outcome.message);
        ExitCode::FAILURE
    }
}

fn read_value(path: &Path) -> Result<serde_json::Value, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| format!("invalid JSON: {e}"))
}

fn check(store: &RecordStore, verbose: bool) -> ExitCode {
    println!("Checking: {}", store.users_path().display());
    match invalid_records(store, verbose) {
        Ok(0) => {
            println!("✓ All records valid");
            ExitCode::SUCCESS
        }
        Ok(errors) => {
            println!("✗ {errors} record(s) with invalid dates");
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("✗ Users document unreadable: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints per-record results and returns how many records have bad dates.
/// An unreadable document is an error, never an empty collection.
fn invalid_records(store: &RecordStore, verbose: bool) -> Result<usize, StoreError> {
    let records: UserMap = read_json(store.users_path())?;
    println!("Records: {}\n", records.len());

    let mut errors = 0;

    for (user_id, record) in &records {
        let start_ok = record.start_on().is_some();
        let expire_ok = record.expire_on().is_some();

        if start_ok && expire_ok {
            if verbose {
                println!(
                    "  ✓ {user_id}: {} → {}",
                    record.start_date, record.expire_date
                );
            }
            continue;
        }

        errors += 1;
        if !start_ok {
            println!("  ✗ {user_id}: invalid start_date {:?}", record.start_date);
        }
        if !expire_ok {
            println!("  ✗ {user_id}: invalid expire_date {:?}", record.expire_date);
        }
    }

    println!();
    Ok(errors)
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
