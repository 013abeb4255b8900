//! Calendar clock abstraction.
//!
//! All expiry arithmetic works on whole calendar days, so the only thing
//! the rest of the crate needs from a clock is "what date is it today".

use std::sync::Mutex;

use chrono::{Days, Local, NaiveDate};

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    /// Returns today's date.
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a settable date.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Creates a clock that reports `date` until changed.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    /// Moves the clock to `date`.
    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = date;
    }

    /// Moves the clock forward by `days`.
    pub fn advance_days(&self, days: u64) {
        let mut date = self.date.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(next) = date.checked_add_days(Days::new(days)) {
            *date = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
