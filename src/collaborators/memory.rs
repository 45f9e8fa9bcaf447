//! In-process entity store
//!
//! Holds vehicles and waypoints for hosts without a backend, and for tests.
//!
//! ## Semantics
//!
//! - Vehicles and waypoints keep insertion order
//! - Deleting a vehicle unassigns its waypoints instead of deleting them
//! - Assigning a waypoint to a different vehicle clears its passed flag
//! - Position updates for unknown vehicles fail with `VehicleNotFound`
//! - New ids come from an injected [`IdAllocator`]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::mission::{Waypoint, WaypointId};
use globe_fleet_core::vehicle::{Vehicle, VehicleId};

use super::{EntitySource, PositionStore, WorkingSet};
use crate::error::{FleetError, Result};

/// Kind of entity an id is allocated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Vehicle,
    Waypoint,
}

impl EntityKind {
    fn prefix(self) -> &'static str {
        match self {
            EntityKind::Vehicle => "vehicle",
            EntityKind::Waypoint => "waypoint",
        }
    }
}

/// Source of fresh entity ids
pub trait IdAllocator: Send + Sync {
    fn next_id(&self, kind: EntityKind) -> String;
}

/// `vehicle-1`, `waypoint-2`, ... from one shared counter
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self, kind: EntityKind) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", kind.prefix(), n)
    }
}

#[derive(Debug, Default)]
struct Entities {
    vehicles: Vec<Vehicle>,
    waypoints: Vec<Waypoint>,
}

/// Entity store kept in memory
pub struct MemoryEntityStore {
    ids: Box<dyn IdAllocator>,
    entities: Mutex<Entities>,
}

impl Default for MemoryEntityStore {
    fn default() -> Self {
        Self::new(SequentialIds::new())
    }
}

impl MemoryEntityStore {
    pub fn new(ids: impl IdAllocator + 'static) -> Self {
        Self {
            ids: Box::new(ids),
            entities: Mutex::new(Entities::default()),
        }
    }

    fn entities(&self) -> MutexGuard<'_, Entities> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Vehicles --

    /// Add a vehicle with a freshly allocated id
    pub fn create_vehicle(&self, name: &str, position: GeoPosition) -> VehicleId {
        let id = VehicleId::new(self.ids.next_id(EntityKind::Vehicle));
        self.entities()
            .vehicles
            .push(Vehicle::new(id.clone(), position).with_name(name));
        id
    }

    /// Add a vehicle with a caller-chosen id
    pub fn insert_vehicle(&self, vehicle: Vehicle) -> Result<()> {
        let mut entities = self.entities();
        if entities.vehicles.iter().any(|v| v.id == vehicle.id) {
            return Err(FleetError::AlreadyExists(vehicle.id.to_string()));
        }
        entities.vehicles.push(vehicle);
        Ok(())
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        self.entities().vehicles.iter().find(|v| &v.id == id).cloned()
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.entities().vehicles.clone()
    }

    /// Remove a vehicle; its waypoints become unassigned
    pub fn delete_vehicle(&self, id: &VehicleId) -> Result<()> {
        let mut entities = self.entities();
        let before = entities.vehicles.len();
        entities.vehicles.retain(|v| &v.id != id);
        if entities.vehicles.len() == before {
            return Err(FleetError::VehicleNotFound(id.clone()));
        }
        for waypoint in entities.waypoints.iter_mut() {
            if waypoint.is_assigned_to(id) {
                waypoint.assign(None);
            }
        }
        Ok(())
    }

    pub fn update_position(&self, id: &VehicleId, position: GeoPosition) -> Result<()> {
        if !position.is_finite() {
            return Err(FleetError::Persistence(format!(
                "non-finite position for {id}"
            )));
        }
        let mut entities = self.entities();
        let vehicle = entities
            .vehicles
            .iter_mut()
            .find(|v| &v.id == id)
            .ok_or_else(|| FleetError::VehicleNotFound(id.clone()))?;
        vehicle.position = position;
        Ok(())
    }

    // -- Waypoints --

    /// Add an unassigned waypoint with a freshly allocated id
    pub fn create_waypoint(&self, position: GeoPosition) -> WaypointId {
        let id = WaypointId::new(self.ids.next_id(EntityKind::Waypoint));
        self.entities()
            .waypoints
            .push(Waypoint::new(id.clone(), position));
        id
    }

    /// Assign a waypoint to a vehicle, or unassign it with `None`
    pub fn assign_waypoint(&self, waypoint_id: &WaypointId, vehicle_id: Option<&VehicleId>) -> Result<()> {
        let mut entities = self.entities();
        if let Some(vehicle_id) = vehicle_id {
            if !entities.vehicles.iter().any(|v| &v.id == vehicle_id) {
                return Err(FleetError::VehicleNotFound(vehicle_id.clone()));
            }
        }
        let waypoint = entities
            .waypoints
            .iter_mut()
            .find(|wp| &wp.id == waypoint_id)
            .ok_or_else(|| FleetError::WaypointNotFound(waypoint_id.to_string()))?;
        waypoint.assign(vehicle_id.cloned());
        Ok(())
    }

    pub fn delete_waypoint(&self, id: &WaypointId) -> Result<()> {
        let mut entities = self.entities();
        let before = entities.waypoints.len();
        entities.waypoints.retain(|wp| &wp.id != id);
        if entities.waypoints.len() == before {
            return Err(FleetError::WaypointNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.entities().waypoints.clone()
    }

    /// Waypoints assigned to a vehicle, in insertion order
    pub fn waypoints_for(&self, vehicle_id: &VehicleId) -> Vec<Waypoint> {
        self.entities()
            .waypoints
            .iter()
            .filter(|wp| wp.is_assigned_to(vehicle_id))
            .cloned()
            .collect()
    }
}

impl EntitySource for MemoryEntityStore {
    fn working_set(&self) -> WorkingSet {
        let entities = self.entities();
        WorkingSet {
            vehicles: entities.vehicles.clone(),
            waypoints: entities.waypoints.clone(),
        }
    }
}

#[async_trait]
impl PositionStore for MemoryEntityStore {
    async fn update_vehicle_position(
        &self,
        vehicle_id: &VehicleId,
        position: GeoPosition,
    ) -> Result<()> {
        self.update_position(vehicle_id, position)
    }
}
