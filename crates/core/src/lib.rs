//! globe_fleet_core - Pure no_std motion logic for globe_fleet
//!
//! This crate contains platform-agnostic algorithms and types
//! that can be tested on host without a runtime or any I/O.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **no_std + alloc**: Ids and waypoint lists need heap storage, nothing else
//! - **Trait abstractions**: Clocks injected via traits
//!
//! # Modules
//!
//! - [`geo`]: Haversine distance and linear step interpolation on the globe
//! - [`vehicle`]: Vehicle records and path history
//! - [`mission`]: Waypoint records and the per-vehicle waypoint sequencer
//! - [`control`]: Manual input snapshots and per-frame displacement
//! - [`traits`]: Platform-agnostic trait abstractions (TimeSource)

#![no_std]

extern crate alloc;

pub mod control;
pub mod geo;
pub mod mission;
pub mod traits;
pub mod vehicle;
