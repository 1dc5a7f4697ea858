//! Monotonic timestamp source and the recurring heartbeat-service tick.
//!
//! Timestamps the session reads concurrently (`last_sent`, `last_received`)
//! are stored as plain atomic millisecond counters relative to the clock's
//! own epoch, not as atomics holding a pointer to a timestamp object: no
//! indirection, no lifetime to manage, just a `u64` that can be loaded from
//! any task without touching the session's `RefCell` borrow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::time::{self, Interval, MissedTickBehavior};

/// A single, shared monotonic epoch. All `AtomicInstant` values on a session
/// are offsets from the same `Clock`, so they remain comparable even though
/// each is an independent atomic.
#[derive(Debug)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Clock {
        Clock {
            epoch: Instant::now(),
        }
    }

    pub fn now(&self) -> AtomicInstant {
        AtomicInstant::from_millis(self.millis_since_epoch(Instant::now()))
    }

    fn millis_since_epoch(&self, instant: Instant) -> u64 {
        instant
            .checked_duration_since(self.epoch)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Offset of an already-captured `AtomicInstant` is meaningless outside
    /// the `Clock` that produced it; this crate never mixes clocks, so the
    /// two are conceptually paired one-to-one for the lifetime of a session.
    pub fn elapsed_since(&self, earlier: &AtomicInstant) -> Duration {
        let now = self.millis_since_epoch(Instant::now());
        Duration::from_millis(now.saturating_sub(earlier.millis()))
    }
}

impl Default for Clock {
    fn default() -> Clock {
        Clock::new()
    }
}

/// An atomically readable/writable point in time, millisecond resolution,
/// relative to its owning [`Clock`]'s epoch.
#[derive(Debug, Default)]
pub struct AtomicInstant(AtomicU64);

impl AtomicInstant {
    fn from_millis(millis: u64) -> AtomicInstant {
        AtomicInstant(AtomicU64::new(millis))
    }

    pub fn millis(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, value: &AtomicInstant) {
        self.0.store(value.millis(), Ordering::Release);
    }
}

/// Wraps `tokio::time::interval` at a cadence suitable for driving
/// `heartbeat_service`: no more than a quarter of the negotiated heartbeat
/// interval, so liveness checks never lag behind by more than that margin.
pub fn heartbeat_tick(heartbeat_interval: Duration) -> Interval {
    let period = (heartbeat_interval / 4).max(Duration::from_millis(250));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
