//! Vehicle records and path history
//!
//! A [`Vehicle`] is the simulation-owned copy of an entity record: identity,
//! live position and the start-label bookkeeping flag. [`PathHistory`] is the
//! trail of positions a vehicle occupied during the current autonomous run.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::geo::GeoPosition;

/// Vehicle identifier (unique string id from the entity store)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self(String::from(id))
    }
}

impl From<String> for VehicleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Simulated vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    /// Unique identifier
    pub id: VehicleId,
    /// Display name
    pub name: String,
    /// Live position, written by whichever driver owns the vehicle
    pub position: GeoPosition,
    /// Set once the start-of-route label has been emitted
    pub has_start_label: bool,
}

impl Vehicle {
    pub fn new(id: impl Into<VehicleId>, position: GeoPosition) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            position,
            has_start_label: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Ordered trail of positions occupied during an autonomous run
///
/// Grows monotonically while the run is active. Only [`PathHistory::reset`]
/// shrinks it, which the autonomous driver calls when a run (re)starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathHistory {
    points: Vec<GeoPosition>,
}

impl PathHistory {
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Clear the trail and seed it with the run's start position
    pub fn reset(&mut self, start: GeoPosition) {
        self.points.clear();
        self.points.push(start);
    }

    pub fn push(&mut self, position: GeoPosition) {
        self.points.push(position);
    }

    pub fn points(&self) -> &[GeoPosition] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&GeoPosition> {
        self.points.last()
    }
}
