//! Runtime infrastructure
//!
//! Logging macros and the tokio-backed clock shared by the motion loops.

pub mod clock;
pub mod logging;

pub use clock::TokioClock;
