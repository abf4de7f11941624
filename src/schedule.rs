use std::time::{Duration, Instant};

/// A recurring deadline polled from the UI loop.
///
/// The UI calls [`Ticker::poll`] every frame and does the periodic work when it returns
/// `true`. Missed deadlines are collapsed into one firing and the schedule restarts from
/// the current time. Dropping the ticker cancels every future firing.
#[derive(Clone, Debug)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First firing one full period after `now`.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` at most once per elapsed deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }
        true
    }

    /// How long the UI may sleep before the next deadline.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}
