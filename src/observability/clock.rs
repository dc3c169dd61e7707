//! Time collaborator (§6).
//!
//! The timer wheel's unit is 1 ms; the rest of the core reports
//! nanosecond-resolution timestamps for statistics. Both come from the same
//! monotonic source so tick advancement and latency measurement never
//! disagree about elapsed time.

use std::sync::OnceLock;
use std::time::Instant;

/// A monotonic clock producing nanosecond timestamps and millisecond ticks.
pub trait Clock: Send + Sync {
    /// Nanoseconds since an arbitrary, fixed epoch (process start).
    fn now_nanos(&self) -> u64;

    /// Milliseconds since the same epoch as [`Clock::now_nanos`], truncated
    /// to the timer wheel's tick unit (1 ms).
    fn now_millis_tick(&self) -> u64 {
        self.now_nanos() / 1_000_000
    }
}

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Default [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        process_epoch().elapsed().as_nanos() as u64
    }
}
