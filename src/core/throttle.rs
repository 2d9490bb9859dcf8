use chrono::{DateTime, TimeDelta, Utc};

/// Minimum time between two effective updates of the same entity.
pub const MIN_TIME_BETWEEN_UPDATES: TimeDelta = TimeDelta::hours(6);

/// Time-since-last-call guard of a single entity.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Throttle {
    min_interval: TimeDelta,
    last_call: Option<DateTime<Utc>>,
}

impl Throttle {
    pub const fn new(min_interval: TimeDelta) -> Self {
        Self { min_interval, last_call: None }
    }

    /// Record the call at `now` unless the previous one was too recent.
    #[must_use]
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(last_call) = self.last_call
            && now - last_call < self.min_interval
        {
            return false;
        }
        self.last_call = Some(now);
        true
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(MIN_TIME_BETWEEN_UPDATES)
    }
}
