//! Reminder scheduler state.

use chrono::NaiveDate;
use serde::Serialize;

/// Outcome of one reminder scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Date the scan ran for.
    pub date: NaiveDate,

    /// True when reminders were disabled and nothing was scanned.
    pub skipped: bool,

    /// Number of users matched per pre-expiry day offset.
    pub expiring: Vec<(i64, usize)>,

    /// Number of users matched by the expired check.
    pub expired: usize,

    /// Messages the host accepted.
    pub delivered: usize,

    /// Messages that were only logged (no host or delivery failed).
    pub undelivered: usize,
}

impl ScanReport {
    /// Creates an empty report for `date`.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            skipped: false,
            expiring: Vec::new(),
            expired: 0,
            delivered: 0,
            undelivered: 0,
        }
    }

    /// Creates the report of a scan skipped because reminders are disabled.
    #[must_use]
    pub fn skipped(date: NaiveDate) -> Self {
        let mut report = Self::new(date);
        report.skipped = true;
        report
    }

    /// Records the outcome of one dispatch.
    pub fn record_dispatch(&mut self, delivered: bool) {
        if delivered {
            self.delivered += 1;
        } else {
            self.undelivered += 1;
        }
    }

    /// Total number of users notified about.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.expiring.iter().map(|(_, count)| count).sum::<usize>() + self.expired
    }
}

/// Shared state of the reminder loop.
#[derive(Debug, Default)]
pub struct ReminderState {
    /// Whether the loop is currently running.
    pub is_running: bool,

    /// Number of scans that finished without error.
    pub scans_completed: u64,

    /// Number of scans that failed.
    pub scans_failed: u64,

    /// Report of the most recent successful scan.
    pub last_report: Option<ScanReport>,
}

impl ReminderState {
    /// Creates a new, stopped state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the result of a completed scan.
    pub fn record_scan(&mut self, report: ScanReport) {
        self.scans_completed += 1;
        self.last_report = Some(report);
    }

    /// Counts a failed scan.
    pub fn record_failure(&mut self) {
        self.scans_failed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_default_state() {
        let state = ReminderState::new();
        assert!(!state.is_running);
        assert_eq!(state.scans_completed, 0);
        assert!(state.last_report.is_none());
    }

    #[test]
    fn test_record_scan() {
        let mut state = ReminderState::new();
        let mut report = ScanReport::new(date());
        report.expiring.push((3, 2));
        report.expired = 1;
        report.record_dispatch(true);
        report.record_dispatch(false);

        state.record_scan(report);
        state.record_failure();

        assert_eq!(state.scans_completed, 1);
        assert_eq!(state.scans_failed, 1);
        let last = state.last_report.unwrap();
        assert_eq!(last.matched(), 3);
        assert_eq!((last.delivered, last.undelivered), (1, 1));
    }

    #[test]
    fn test_skipped_report() {
        let report = ScanReport::skipped(date());
        assert!(report.skipped);
        assert_eq!(report.matched(), 0);
    }
}
