//! Rate limiting for high-frequency UI events

use std::time::{Duration, Instant};

/// Lets at most one event through per interval; the rest are dropped
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Returns true if an event arriving at `now` should be applied
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

/// Fold an arbitrary bearing into [0, 360)
pub fn normalize_bearing(degrees: f64) -> f64 {
    let b = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negatives
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}
