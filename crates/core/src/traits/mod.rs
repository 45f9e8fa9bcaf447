//! Core traits for platform-agnostic motion logic.
//!
//! This module provides trait abstractions that decouple the drivers from
//! the clock that paces them.
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - The tokio-backed clock lives in the runtime crate

pub mod time;

pub use time::{MockTime, TimeSource};
