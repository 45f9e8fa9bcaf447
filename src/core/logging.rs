//! Logging abstraction
//!
//! Provides unified logging macros for the runtime crate:
//! - Library code: `log_info!`, `log_warn!`, `log_error!`, `log_debug!`,
//!   `log_trace!`, all forwarding to `tracing` under the `globe_fleet` target
//! - Binaries and tests: call [`init`] once to install a `tracing-subscriber`
//!   formatter filtered by `RUST_LOG` (default `info`)
//!
//! Nothing is printed until a subscriber is installed, so library users keep
//! full control over log output.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install a formatting subscriber
///
/// Returns `false` if a global subscriber was already installed (tests call
/// this repeatedly; only the first call wins).
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        $crate::__tracing::info!(target: "globe_fleet", $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        $crate::__tracing::warn!(target: "globe_fleet", $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        $crate::__tracing::error!(target: "globe_fleet", $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        $crate::__tracing::debug!(target: "globe_fleet", $($arg)*);
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        $crate::__tracing::trace!(target: "globe_fleet", $($arg)*);
    }};
}
