//! Clock abstraction used by the failure gate and retry backoff.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of the current time, abstracted so gate/backoff logic can be
/// driven by a fake clock in tests instead of real wall time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Milliseconds elapsed since an arbitrary, monotonic epoch. Used for
    /// relative measurements (elapsed durations, backoff timers).
    fn now_millis(&self) -> u64;

    /// Unix epoch milliseconds, used for timestamps that must survive
    /// process restarts (gate state persisted to disk).
    fn unix_millis(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

/// Production clock backed by `Instant::now()` and the system clock.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
