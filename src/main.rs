//! Expiry Reminder Bot - Main Entry Point
//!
//! Runs the plugin against a console host: each stdin line is an inbound
//! message of the form `<sender_id> <message text>`, replies are printed to
//! stdout and outbound reminders go to the log.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use expiry_reminder_bot::clock::SystemClock;
use expiry_reminder_bot::config::BotSettings;
use expiry_reminder_bot::messaging::{LogMessenger, Messenger};
use expiry_reminder_bot::plugin::ExpiryPlugin;
use expiry_reminder_bot::store::RecordStore;

/// Chat bot plugin that tracks service expiry dates and sends reminders.
#[derive(Parser, Debug)]
#[command(name = "expiry_bot")]
#[command(about = "Track user service expiry dates and send daily reminders")]
#[command(version)]
struct Args {
    /// Directory holding users.json and config.json (overrides DATA_DIR).
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Create the default data documents and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(data_dir) = args.data_dir {
        settings.data_dir = data_dir;
    }
    settings.validate().context("Invalid bot settings")?;

    let store = RecordStore::open(&settings.data_dir, Arc::new(SystemClock))
        .context("Failed to open record store")?;

    if args.init {
        println!("✓ Data documents ready in: {}", settings.data_dir.display());
        println!("  users:  {}", store.users_path().display());
        println!("  config: {}", store.config_path().display());
        return Ok(());
    }

    let messenger: Arc<dyn Messenger> = Arc::new(LogMessenger);
    let plugin = ExpiryPlugin::new(Arc::new(store), Some(messenger), settings.clone());

    info!("Starting expiry bot...");
    info!("Command prefix: {}", settings.command_prefix);
    plugin.start_reminders().await;

    info!("Bot is running. Enter '<sender_id> <message>' lines, Ctrl+C to stop.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&plugin, &line).await,
                    Ok(None) => {
                        info!("Input closed, shutting down...");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    plugin.stop_reminders().await;

    Ok(())
}

/// Feeds one console line to the plugin and prints the reply.
async fn handle_line(plugin: &ExpiryPlugin, line: &str) {
    let Some((sender_id, text)) = line.trim().split_once(char::is_whitespace) else {
        if !line.trim().is_empty() {
            warn!("Expected '<sender_id> <message>', got: {}", line.trim());
        }
        return;
    };

    if let Some(reply) = plugin.process_message(text, sender_id).await {
        println!("{reply}");
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
