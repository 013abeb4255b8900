//! Reminder scheduler runner.
//!
//! Each tick of the scheduler:
//! 1. Re-reads the configuration document, so admin edits apply without a
//!    restart
//! 2. If reminders are disabled, records a skipped scan and stops there
//! 3. For every configured pre-expiry offset, broadcasts a reminder to each
//!    user whose expiry is exactly that many days away (offset 0 uses the
//!    final-notice wording)
//! 4. Privately notifies every admin about users that expired exactly
//!    `expired_check_days` ago
//!
//! Matching is by exact date, so a day on which the scan does not run is a
//! day whose reminders are never sent.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::{ReminderState, ScanReport};
use crate::config::DEFAULT_REMINDER_INTERVAL_SECS;
use crate::messaging::Dispatcher;
use crate::store::{RecordStore, StoreError, UserRecord};

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Run a scan now, without waiting for the timer.
    TriggerScan,
    /// Stop the scheduler.
    Shutdown,
}

/// Errors that abort a single scan.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Store query failed: {0}")]
    Store(#[from] StoreError),
}

/// Periodic expiry scanner.
pub struct ReminderScheduler {
    /// User records and configuration documents.
    store: Arc<RecordStore>,

    /// Outbound messages to the host.
    dispatcher: Dispatcher,

    /// Shared loop state.
    state: Arc<RwLock<ReminderState>>,

    /// Time between scans.
    scan_interval: Duration,
}

impl ReminderScheduler {
    /// Creates a scheduler that scans once a day.
    #[must_use]
    pub fn new(
        store: Arc<RecordStore>,
        dispatcher: Dispatcher,
        state: Arc<RwLock<ReminderState>>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            state,
            scan_interval: Duration::from_secs(DEFAULT_REMINDER_INTERVAL_SECS),
        }
    }

    /// Sets the time between scans.
    #[must_use]
    pub const fn with_interval(mut self, scan_interval: Duration) -> Self {
        self.scan_interval = scan_interval;
        self
    }

    /// Runs the scheduler loop until shutdown. The first scan happens
    /// immediately.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!(
            "Reminder scheduler started (interval: {}s)",
            self.scan_interval.as_secs()
        );
        self.state.write().await.is_running = true;

        let mut scan_timer = interval(self.scan_interval);
        scan_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = scan_timer.tick() => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::TriggerScan) => {
                            debug!("Received trigger scan message");
                            self.tick().await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Reminder scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.state.write().await.is_running = false;
    }

    /// Single tick: scan, then record the outcome. Errors are logged and
    /// never stop the loop.
    async fn tick(&self) {
        match self.scan().await {
            Ok(report) => {
                info!(
                    "Reminder scan for {} finished: {} matched, {} delivered, {} undelivered{}",
                    report.date,
                    report.matched(),
                    report.delivered,
                    report.undelivered,
                    if report.skipped { " (disabled)" } else { "" }
                );
                self.state.write().await.record_scan(report);
            }
            Err(e) => {
                error!("Reminder scan failed: {}", e);
                self.state.write().await.record_failure();
            }
        }
    }

    /// Performs one full reminder scan.
    pub async fn scan(&self) -> Result<ScanReport, ReminderError> {
        let config = self.store.load_config();
        let today = self.store.today();

        if !config.reminder_enabled {
            debug!("Reminders disabled, skipping scan");
            return Ok(ScanReport::skipped(today));
        }

        let mut report = ScanReport::new(today);

        for &offset in &config.reminder_days_before {
            if offset < 0 {
                warn!("Ignoring negative reminder offset: {}", offset);
                continue;
            }

            let users = self.store.find_expiring_in(offset)?;
            for (user_id, record) in &users {
                let message = if offset == 0 {
                    expires_today_notice(user_id, record)
                } else {
                    expiring_notice(user_id, record, offset)
                };

                info!("Sending {}-day expiry reminder: {}", offset, user_id);
                let delivered = self.dispatcher.broadcast(&message).await;
                report.record_dispatch(delivered);
            }
            report.expiring.push((offset, users.len()));
        }

        if config.expired_check_days < 0 {
            warn!(
                "Ignoring negative expired check offset: {}",
                config.expired_check_days
            );
            return Ok(report);
        }

        let expired = self.store.find_expired_since(config.expired_check_days)?;
        for (user_id, record) in &expired {
            let message = expired_admin_notice(user_id, record);
            for admin_id in &config.admins {
                info!("Sending expiry notice to admin {}: {}", admin_id, user_id);
                let delivered = self.dispatcher.direct(admin_id, &message).await;
                report.record_dispatch(delivered);
            }
        }
        report.expired = expired.len();

        Ok(report)
    }

    /// Gets a reference to the scheduler state.
    #[must_use]
    pub fn state(&self) -> &Arc<RwLock<ReminderState>> {
        &self.state
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("scan_interval", &self.scan_interval)
            .finish_non_exhaustive()
    }
}

/// Handle to a spawned scheduler task.
#[derive(Debug)]
pub struct ReminderHandle {
    tx: mpsc::Sender<SchedulerMessage>,
    task: JoinHandle<()>,
}

impl ReminderHandle {
    /// Spawns `scheduler` on the current runtime.
    #[must_use]
    pub fn spawn(scheduler: ReminderScheduler) -> Self {
        let (tx, rx) = mpsc::channel::<SchedulerMessage>(8);
        let task = tokio::spawn(async move {
            scheduler.run(rx).await;
        });
        Self { tx, task }
    }

    /// Requests an immediate scan. Returns false if the loop has exited.
    pub async fn trigger(&self) -> bool {
        self.tx.send(SchedulerMessage::TriggerScan).await.is_ok()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.tx.send(SchedulerMessage::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Reminder task ended abnormally: {}", e);
        }
    }
}

fn username_line(record: &UserRecord) -> String {
    if record.platform_username.is_empty() {
        String::new()
    } else {
        format!("\nUsername: {}", record.platform_username)
    }
}

fn expiring_notice(user_id: &str, record: &UserRecord, days: i64) -> String {
    format!(
        "⚠️ @{user_id} your service expires in {days} days ({}), please renew in time!{}",
        record.expire_date,
        username_line(record)
    )
}

fn expires_today_notice(user_id: &str, record: &UserRecord) -> String {
    format!(
        "🚨 @{user_id} your service expires today ({}), this is the final reminder!{}",
        record.expire_date,
        username_line(record)
    )
}

fn expired_admin_notice(user_id: &str, record: &UserRecord) -> String {
    let username = if record.platform_username.is_empty() {
        "not set"
    } else {
        record.platform_username.as_str()
    };
    format!(
        "🔴 Admin notice: user @{user_id} (username: {username}) expired on {}, please shut the service down.",
        record.expire_date
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::ReminderConfig;
    use crate::messaging::{DispatchError, Messenger};
    use crate::store::UserMap;

    #[derive(Default)]
    struct RecordingMessenger {
        group: Mutex<Vec<String>>,
        private: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_group_message(&self, text: &str) -> Result<(), DispatchError> {
            self.group.lock().unwrap().push(text.to_owned());
            Ok(())
        }

        async fn send_private_message(&self, user_id: &str, text: &str) -> Result<(), DispatchError> {
            if user_id == "offline-admin" {
                return Err(DispatchError::Unreachable(user_id.to_owned()));
            }
            self.private
                .lock()
                .unwrap()
                .push((user_id.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<RecordStore>,
        messenger: Arc<RecordingMessenger>,
        scheduler: ReminderScheduler,
    }

    fn fixture(config: &ReminderConfig) -> Fixture {
        let today = day(2024, 8, 10);
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(today));
        let store = Arc::new(RecordStore::open(dir.path(), clock).unwrap());
        store.save_config(config);

        let mut records = UserMap::new();
        records.insert("in3".to_owned(), UserRecord::new("alice", today, day(2024, 8, 13)));
        records.insert("in2".to_owned(), UserRecord::new("", today, day(2024, 8, 12)));
        records.insert("today".to_owned(), UserRecord::new("", today, today));
        records.insert("ago1".to_owned(), UserRecord::new("", today, day(2024, 8, 9)));
        records.insert("ago2".to_owned(), UserRecord::new("", today, day(2024, 8, 8)));
        records.insert(
            "broken".to_owned(),
            UserRecord {
                expire_date: "2024/08/13".to_owned(),
                ..UserRecord::default()
            },
        );
        store.save_records(&records);

        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = Dispatcher::new(Some(messenger.clone()));
        let scheduler = ReminderScheduler::new(
            Arc::clone(&store),
            dispatcher,
            Arc::new(RwLock::new(ReminderState::new())),
        );

        Fixture {
            _dir: dir,
            store,
            messenger,
            scheduler,
        }
    }

    fn admin_config(admins: &[&str]) -> ReminderConfig {
        ReminderConfig {
            admins: admins.iter().map(|s| (*s).to_owned()).collect(),
            ..ReminderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_default_scan_matches_exact_dates() {
        let fx = fixture(&admin_config(&["900", "901"]));
        let report = fx.scheduler.scan().await.unwrap();

        assert!(!report.skipped);
        assert_eq!(report.expiring, vec![(3, 1), (0, 1)]);
        assert_eq!(report.expired, 1);
        assert_eq!(report.delivered, 4);
        assert_eq!(report.undelivered, 0);

        let group = fx.messenger.group.lock().unwrap().clone();
        assert_eq!(group.len(), 2);
        assert!(group[0].contains("@in3") && group[0].contains("in 3 days"));
        assert!(group[0].contains("Username: alice"));
        assert!(group[1].contains("@today") && group[1].contains("final reminder"));

        let private = fx.messenger.private.lock().unwrap().clone();
        let recipients: Vec<&str> = private.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(recipients, vec!["900", "901"]);
        assert!(private[0].1.contains("@ago1") && private[0].1.contains("username: not set"));
    }

    #[tokio::test]
    async fn test_scan_uses_configured_offsets() {
        let config = ReminderConfig {
            reminder_days_before: vec![2, -1],
            expired_check_days: 2,
            ..admin_config(&["900"])
        };
        let fx = fixture(&config);
        let report = fx.scheduler.scan().await.unwrap();

        assert_eq!(report.expiring, vec![(2, 1)]);
        let group = fx.messenger.group.lock().unwrap().clone();
        assert!(group[0].contains("@in2"));

        let private = fx.messenger.private.lock().unwrap().clone();
        assert_eq!(private.len(), 1);
        assert!(private[0].1.contains("@ago2"));
    }

    #[tokio::test]
    async fn test_disabled_reminders_skip_scan() {
        let config = ReminderConfig {
            reminder_enabled: false,
            ..admin_config(&["900"])
        };
        let fx = fixture(&config);
        let report = fx.scheduler.scan().await.unwrap();

        assert!(report.skipped);
        assert!(fx.messenger.group.lock().unwrap().is_empty());
        assert!(fx.messenger.private.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_config_is_reread_every_scan() {
        let fx = fixture(&admin_config(&[]));
        assert!(!fx.scheduler.scan().await.unwrap().skipped);

        fx.store.save_config(&ReminderConfig {
            reminder_enabled: false,
            ..ReminderConfig::default()
        });
        assert!(fx.scheduler.scan().await.unwrap().skipped);
    }

    #[tokio::test]
    async fn test_failed_admin_delivery_does_not_stop_others() {
        let fx = fixture(&admin_config(&["offline-admin", "900"]));
        let report = fx.scheduler.scan().await.unwrap();

        assert_eq!(report.undelivered, 1);
        let private = fx.messenger.private.lock().unwrap().clone();
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].0, "900");
    }

    #[tokio::test]
    async fn test_out_of_range_offset_fails_scan_but_not_loop() {
        let config = ReminderConfig {
            reminder_days_before: vec![i64::MAX],
            ..ReminderConfig::default()
        };
        let fx = fixture(&config);
        assert!(matches!(fx.scheduler.scan().await, Err(ReminderError::Store(_))));

        let state = Arc::clone(fx.scheduler.state());
        let handle = ReminderHandle::spawn(fx.scheduler);
        assert!(handle.trigger().await);
        handle.shutdown().await;

        let state = state.read().await;
        assert_eq!(state.scans_failed, 2);
        assert_eq!(state.scans_completed, 0);
        assert!(!state.is_running);
    }

    #[tokio::test]
    async fn test_loop_scans_immediately_and_on_trigger() {
        let fx = fixture(&admin_config(&["900"]));
        let state = Arc::clone(fx.scheduler.state());
        let messenger = Arc::clone(&fx.messenger);

        let handle = ReminderHandle::spawn(fx.scheduler.with_interval(Duration::from_secs(3600)));
        assert!(handle.trigger().await);
        handle.shutdown().await;

        let state = state.read().await;
        assert_eq!(state.scans_completed, 2);
        assert!(!state.is_running);
        assert_eq!(messenger.group.lock().unwrap().len(), 4);
    }
}
