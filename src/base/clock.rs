//! Calendar clock used to resolve "today".

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of the current calendar date.
pub trait Clock: Send + Sync + 'static {
    /// The current date.
    fn today(&self) -> NaiveDate;
}

/// A clock that reads the system time in a fixed time zone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    tz: Tz,
}

impl ZonedClock {
    /// Create a clock for `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for ZonedClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }
}

/// A clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
