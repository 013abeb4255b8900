//! The expiry reminder plugin.
//!
//! [`ExpiryPlugin`] is the single service object a host constructs at
//! startup. It owns the record store handle, the in-memory configuration,
//! the command handler and the reminder loop.

pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

pub use settings::{SaveOutcome, SettingsSnapshot, SettingsUpdate, UserStats};

use crate::commands::{BotCommand, CommandHandler};
use crate::config::{BotSettings, ReminderConfig};
use crate::messaging::{Dispatcher, Messenger};
use crate::scheduler::{ReminderHandle, ReminderScheduler, ReminderState};
use crate::store::RecordStore;

/// Descriptive information about the plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub commands: Vec<String>,
}

/// Service object tying the store, commands and reminders together.
pub struct ExpiryPlugin {
    store: Arc<RecordStore>,
    config: Arc<RwLock<ReminderConfig>>,
    handler: CommandHandler,
    dispatcher: Dispatcher,
    settings: BotSettings,
    reminder_state: Arc<RwLock<ReminderState>>,
    reminder: Mutex<Option<ReminderHandle>>,
}

impl ExpiryPlugin {
    /// Creates the plugin. The configuration is loaded once here and kept
    /// in memory for admin checks.
    #[must_use]
    pub fn new(
        store: Arc<RecordStore>,
        messenger: Option<Arc<dyn Messenger>>,
        settings: BotSettings,
    ) -> Self {
        let loaded = store.load_config();
        info!("Expiry plugin initialized, admins: {:?}", loaded.admins);

        let config = Arc::new(RwLock::new(loaded));
        let handler = CommandHandler::new(
            settings.command_prefix.clone(),
            Arc::clone(&store),
            Arc::clone(&config),
        );

        Self {
            store,
            config,
            handler,
            dispatcher: Dispatcher::new(messenger),
            settings,
            reminder_state: Arc::new(RwLock::new(ReminderState::new())),
            reminder: Mutex::new(None),
        }
    }

    /// Handles one inbound message. Returns the reply, if any.
    pub async fn process_message(&self, message_text: &str, sender_id: &str) -> Option<String> {
        self.handler
            .try_handle(message_text, sender_id)
            .await
            .map(|result| result.message)
    }

    /// Starts the reminder loop. Returns false if it is already running.
    pub async fn start_reminders(&self) -> bool {
        let mut reminder = self.reminder.lock().await;
        if reminder.is_some() {
            return false;
        }

        let scheduler = ReminderScheduler::new(
            Arc::clone(&self.store),
            self.dispatcher.clone(),
            Arc::clone(&self.reminder_state),
        )
        .with_interval(self.settings.reminder_interval());

        *reminder = Some(ReminderHandle::spawn(scheduler));
        info!("Reminder task started");
        true
    }

    /// Requests an immediate reminder scan. Returns false if the loop is
    /// not running.
    pub async fn trigger_reminders(&self) -> bool {
        match self.reminder.lock().await.as_ref() {
            Some(handle) => handle.trigger().await,
            None => false,
        }
    }

    /// Stops the reminder loop. Returns false if it was not running.
    pub async fn stop_reminders(&self) -> bool {
        let Some(handle) = self.reminder.lock().await.take() else {
            return false;
        };
        handle.shutdown().await;
        info!("Reminder task stopped");
        true
    }

    /// Shared reminder loop state.
    #[must_use]
    pub fn reminder_state(&self) -> &Arc<RwLock<ReminderState>> {
        &self.reminder_state
    }

    /// Current in-memory configuration.
    pub async fn config(&self) -> ReminderConfig {
        self.config.read().await.clone()
    }

    /// Reads both documents for a settings view.
    pub fn settings(&self) -> SettingsSnapshot {
        settings::snapshot(&self.store)
    }

    /// Replaces documents from a settings view. A replaced configuration
    /// also replaces the in-memory copy.
    pub async fn save_settings(&self, update: SettingsUpdate) -> SaveOutcome {
        let (outcome, config) = settings::apply(&self.store, update);
        if let Some(config) = config {
            *self.config.write().await = config;
        }
        outcome
    }

    /// Describes the plugin and its commands.
    #[must_use]
    pub fn plugin_info(&self) -> PluginInfo {
        let prefix = &self.settings.command_prefix;
        PluginInfo {
            name: "Expiry Reminder",
            version: env!("CARGO_PKG_VERSION"),
            description: "Tracks user service time and sends automatic expiry reminders",
            commands: BotCommand::all_commands()
                .into_iter()
                .map(|(usage, desc, admin_only)| {
                    let suffix = if admin_only { " (admin)" } else { "" };
                    format!("{prefix}{usage} - {desc}{suffix}")
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for ExpiryPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryPlugin")
            .field("store", &self.store)
            .field("dispatcher", &self.dispatcher)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
