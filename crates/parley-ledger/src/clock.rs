//! Time source abstraction.
//!
//! The ledger consumes `now` from an external collaborator so that status
//! expiry and message timestamps are deterministic under test.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

/// Supplies the current instant for timestamps and expiry computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.  The production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually advanced clock for tests.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = to;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().expect("clock lock");
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(DateTime::UNIX_EPOCH);
        let t0 = clock.now();
        clock.advance(TimeDelta::seconds(90));
        assert_eq!(clock.now() - t0, TimeDelta::seconds(90));
    }
}
