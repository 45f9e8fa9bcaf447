//! Tokio-backed time source
//!
//! `TokioClock` measures time with `tokio::time::Instant`, so tests running
//! with paused time (`#[tokio::test(start_paused = true)]`) observe the same
//! virtual clock as the interval timers driving the motion loops.

use globe_fleet_core::traits::TimeSource;
use tokio::time::Instant;

/// Monotonic clock anchored at construction
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
