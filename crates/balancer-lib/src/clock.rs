//! Wall-clock access for time-of-day dependent decisions

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike};

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Unix timestamp in seconds
    fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Hour of day, 0-23
    fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Day of week, 0 = Monday
    fn weekday(&self) -> u32 {
        self.now().weekday().num_days_from_monday()
    }
}

/// Local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
