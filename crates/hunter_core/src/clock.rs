//! Calendar capability injected into the progression service.
//!
//! Day boundaries are local midnight. Tests and demos use `FixedClock` to
//! drive deterministic dates.

use chrono::{Days, Local, NaiveDate};
use std::cell::Cell;

/// Source of "today" for day-rollover and streak rules.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually advanced clock.
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: Cell<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Cell::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.today.set(today);
    }

    /// Moves the clock forward by `days` calendar days.
    pub fn advance_days(&self, days: u64) {
        let current = self.today.get();
        // Saturates at the calendar limit instead of panicking.
        let next = current.checked_add_days(Days::new(days)).unwrap_or(current);
        self.today.set(next);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
