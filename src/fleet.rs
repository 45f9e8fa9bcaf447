//! Fleet working set
//!
//! Local copy of the vehicles and waypoints the drivers operate on. The
//! entity store may add, remove or reassign entities between ticks; each
//! tick starts with [`Fleet::reconcile`] against the latest [`WorkingSet`].
//!
//! ## Reconciliation rules
//!
//! - Vehicles and waypoints missing from the working set are dropped.
//! - New entities are added as supplied.
//! - Live vehicle positions and start-label flags stay local; the store only
//!   ever sees what the drivers write through the position sink.
//! - Waypoint positions and owners follow the store. A waypoint handed to a
//!   different vehicle starts unpassed; otherwise the passed flag is sticky.

use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::mission::{assigned_to, Waypoint, WaypointId};
use globe_fleet_core::vehicle::{Vehicle, VehicleId};

use crate::collaborators::WorkingSet;
use crate::error::{FleetError, Result};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub vehicles_added: Vec<VehicleId>,
    pub vehicles_removed: Vec<VehicleId>,
    pub waypoints_added: usize,
    pub waypoints_removed: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.vehicles_added.is_empty()
            && self.vehicles_removed.is_empty()
            && self.waypoints_added == 0
            && self.waypoints_removed == 0
    }
}

/// Vehicles and waypoints in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    vehicles: Vec<Vehicle>,
    waypoints: Vec<Waypoint>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an entity snapshot
    pub fn from_working_set(set: WorkingSet) -> Self {
        Self {
            vehicles: set.vehicles,
            waypoints: set.waypoints,
        }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles.iter().map(|v| v.id.clone()).collect()
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| &v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: &VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| &v.id == id)
    }

    pub fn contains_vehicle(&self, id: &VehicleId) -> bool {
        self.vehicle(id).is_some()
    }

    pub fn waypoint(&self, id: &WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|wp| &wp.id == id)
    }

    pub fn waypoint_mut(&mut self, id: &WaypointId) -> Option<&mut Waypoint> {
        self.waypoints.iter_mut().find(|wp| &wp.id == id)
    }

    /// Current position of a vehicle
    pub fn position(&self, id: &VehicleId) -> Option<GeoPosition> {
        self.vehicle(id).map(|v| v.position)
    }

    /// Assigned waypoint sequence of a vehicle, in insertion order
    pub fn assigned(&self, id: &VehicleId) -> Vec<&Waypoint> {
        assigned_to(&self.waypoints, id)
    }

    pub fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<()> {
        if self.contains_vehicle(&vehicle.id) {
            return Err(FleetError::AlreadyExists(vehicle.id.to_string()));
        }
        self.vehicles.push(vehicle);
        Ok(())
    }

    pub fn insert_waypoint(&mut self, waypoint: Waypoint) -> Result<()> {
        if self.waypoint(&waypoint.id).is_some() {
            return Err(FleetError::AlreadyExists(waypoint.id.to_string()));
        }
        self.waypoints.push(waypoint);
        Ok(())
    }

    /// Align the local copy with the entity store
    pub fn reconcile(&mut self, set: WorkingSet) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut previous = std::mem::take(&mut self.vehicles);
        for incoming in set.vehicles {
            match previous.iter().position(|v| v.id == incoming.id) {
                Some(idx) => {
                    let mut local = previous.swap_remove(idx);
                    local.name = incoming.name;
                    self.vehicles.push(local);
                }
                None => {
                    report.vehicles_added.push(incoming.id.clone());
                    self.vehicles.push(incoming);
                }
            }
        }
        report.vehicles_removed = previous.into_iter().map(|v| v.id).collect();

        let mut previous = std::mem::take(&mut self.waypoints);
        for incoming in set.waypoints {
            match previous.iter().position(|wp| wp.id == incoming.id) {
                Some(idx) => {
                    let mut local = previous.swap_remove(idx);
                    local.position = incoming.position;
                    let owner_unchanged = local.vehicle_id == incoming.vehicle_id;
                    local.assign(incoming.vehicle_id);
                    if owner_unchanged {
                        local.is_passed |= incoming.is_passed;
                    }
                    self.waypoints.push(local);
                }
                None => {
                    report.waypoints_added += 1;
                    self.waypoints.push(incoming);
                }
            }
        }
        report.waypoints_removed = previous.len();

        report
    }
}
