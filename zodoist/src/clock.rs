//! Wall-clock access.
//!
//! Everything that depends on "now" (view predicates, `completed_at`, the
//! form's default due date) reads it through [`Clock`] so it can be pinned in
//! tests.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    /// Current moment, carrying the user's local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The system clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Freeze at `local` wall time with a UTC offset of zero.
    pub fn at(local: NaiveDateTime) -> Self {
        FixedClock(local.and_utc().fixed_offset())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today_uses_local_offset() {
        // 23:30 at UTC-05:00 is already the next day in UTC.
        let now = DateTime::parse_from_rfc3339("2026-03-04T23:30:00-05:00").unwrap();
        let clock = FixedClock(now);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(
            clock.now_utc().date_naive(),
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
        );
    }
}
