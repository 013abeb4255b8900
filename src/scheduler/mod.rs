//! Reminder scheduler module.
//!
//! Runs the periodic expiry scan and dispatches reminder notifications.

mod runner;
mod state;

pub use runner::{ReminderError, ReminderHandle, ReminderScheduler, SchedulerMessage};
pub use state::{ReminderState, ScanReport};
