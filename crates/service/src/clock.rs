use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Injected wall clock. Time-driven behavior (escalation thresholds,
/// absence-today checks, window stages) goes through this so tests can pin
/// the instant.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock pinned to an instant, advanceable by hand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::{Clock, ManualClock};

    #[test]
    fn manual_clock_returns_the_pinned_instant_until_moved() {
        let start: DateTime<Utc> =
            "2026-03-11T09:00:00Z".parse().expect("valid timestamp");
        let clock = ManualClock::at(start);
        assert_eq!(clock.now_utc(), start);

        let later: DateTime<Utc> =
            "2026-03-12T09:00:00Z".parse().expect("valid timestamp");
        clock.set(later);
        assert_eq!(clock.now_utc(), later);
    }
}
