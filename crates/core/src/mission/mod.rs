//! Waypoint Types
//!
//! Pure data structures for waypoints and their assignment to vehicles.
//!
//! # Assignment Order
//!
//! A vehicle's assigned sequence is the subsequence of the waypoint list whose
//! owner matches, in the order the waypoints were inserted. It is never
//! re-sorted and never stored on its own; [`assigned_to`] derives it on demand.
//!
//! # Note
//!
//! This module contains only pure data types and the sequencer state
//! machine. Shared working-set management lives in the runtime crate.

pub mod sequencer;
pub mod state;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::geo::GeoPosition;
use crate::vehicle::VehicleId;

pub use sequencer::WaypointSequencer;
pub use state::MotionState;

/// Waypoint identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub String);

impl WaypointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WaypointId {
    fn from(id: &str) -> Self {
        Self(String::from(id))
    }
}

impl From<String> for WaypointId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Geographic target a vehicle may be assigned to visit
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Unique identifier
    pub id: WaypointId,
    /// Target position
    pub position: GeoPosition,
    /// Owning vehicle (None = unassigned)
    pub vehicle_id: Option<VehicleId>,
    /// Set when the owning vehicle reached this waypoint
    pub is_passed: bool,
}

impl Waypoint {
    /// Create an unassigned waypoint
    pub fn new(id: impl Into<WaypointId>, position: GeoPosition) -> Self {
        Self {
            id: id.into(),
            position,
            vehicle_id: None,
            is_passed: false,
        }
    }

    /// Builder-style assignment
    pub fn assigned(mut self, vehicle_id: impl Into<VehicleId>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    /// True if this waypoint belongs to `vehicle_id`
    pub fn is_assigned_to(&self, vehicle_id: &VehicleId) -> bool {
        self.vehicle_id.as_ref() == Some(vehicle_id)
    }

    /// Change the owner
    ///
    /// A different owner starts with a fresh, unpassed waypoint. Re-assigning
    /// to the current owner keeps the flag.
    pub fn assign(&mut self, vehicle_id: Option<VehicleId>) {
        if self.vehicle_id != vehicle_id {
            self.vehicle_id = vehicle_id;
            self.is_passed = false;
        }
    }
}

/// Ordered sequence of waypoints assigned to `vehicle_id`
pub fn assigned_to<'a>(waypoints: &'a [Waypoint], vehicle_id: &VehicleId) -> Vec<&'a Waypoint> {
    waypoints
        .iter()
        .filter(|wp| wp.is_assigned_to(vehicle_id))
        .collect()
}
