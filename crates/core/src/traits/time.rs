//! Time abstraction traits for platform-agnostic timing operations.
//!
//! This module provides the `TimeSource` trait that abstracts over different
//! time providers (tokio, mock, etc.) so frame timing can be tested without
//! a runtime.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

/// Platform-agnostic time source for the motion loops.
///
/// This trait abstracts over different time providers:
/// - `TokioClock` (in the runtime crate), which honors paused test time
/// - `MockTime` for host testing with controllable time
///
/// # Example
///
/// ```
/// use globe_fleet_core::traits::{TimeSource, MockTime};
///
/// fn frame_dt<T: TimeSource>(time: &T, last_frame_us: &mut u64) -> f64 {
///     let elapsed = time.elapsed_since(*last_frame_us);
///     *last_frame_us = time.now_us();
///     elapsed as f64 / 1_000_000.0
/// }
///
/// let time = MockTime::new();
/// let mut last = 0;
/// time.advance(16_667);
/// assert!((frame_dt(&time, &mut last) - 0.016667).abs() < 1e-9);
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Returns current time in milliseconds since the source started.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Returns current time in microseconds since the source started.
    fn now_us(&self) -> u64;

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle potential overflow.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source for testing with controllable time advancement.
///
/// Clones share the same counter, so a test can keep one handle and give
/// another to the code under test.
///
/// # Example
///
/// ```
/// use globe_fleet_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// assert_eq!(time.now_us(), 0);
///
/// time.advance(1000); // Advance 1ms
/// assert_eq!(time.now_us(), 1000);
/// assert_eq!(time.now_ms(), 1);
/// ```
#[derive(Clone, Default, Debug)]
pub struct MockTime {
    current_us: Arc<AtomicU64>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Arc::new(AtomicU64::new(us)),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.store(us, Ordering::SeqCst);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.fetch_add(us, Ordering::SeqCst);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
