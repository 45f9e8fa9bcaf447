//! External collaborator interfaces
//!
//! The simulator talks to four outside parties, each behind a trait:
//!
//! - [`SceneRenderer`]: draws paths and labels, redraws on request
//! - [`PositionStore`]: persists vehicle positions (async, may fail)
//! - [`InputSource`]: delivers operator input once per manual frame
//! - [`EntitySource`]: supplies the current vehicle/waypoint working set
//!
//! Bundled implementations: [`memory::MemoryEntityStore`] (in-process store
//! with injected id allocation), [`http::HttpPositionStore`] (REST backend),
//! [`RecordingRenderer`], [`NullRenderer`] and [`SharedInput`].

pub mod http;
pub mod memory;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use globe_fleet_core::control::InputSnapshot;
use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::mission::Waypoint;
use globe_fleet_core::vehicle::{Vehicle, VehicleId};

use crate::error::Result;

pub use http::HttpPositionStore;
pub use memory::{EntityKind, IdAllocator, MemoryEntityStore, SequentialIds};

/// Visual role of a polyline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Positions already occupied during the current autonomous run
    Traveled,
    /// Current position followed by the waypoints still ahead
    Planned,
}

/// Scene rendering collaborator
pub trait SceneRenderer: Send {
    /// Draw a polyline for a vehicle (always at least two positions)
    fn add_path(&mut self, vehicle_id: &VehicleId, style: PathStyle, positions: &[GeoPosition]);

    /// Remove every drawn path
    fn clear_paths(&mut self);

    /// Place the start-of-route label for a vehicle
    fn add_label(&mut self, vehicle_id: &VehicleId, position: &GeoPosition);

    /// Ask the scene to redraw
    fn request_redraw(&mut self);
}

/// Position persistence collaborator
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Store the latest position of a vehicle
    async fn update_vehicle_position(
        &self,
        vehicle_id: &VehicleId,
        position: GeoPosition,
    ) -> Result<()>;
}

#[async_trait]
impl<T: PositionStore + ?Sized> PositionStore for Arc<T> {
    async fn update_vehicle_position(
        &self,
        vehicle_id: &VehicleId,
        position: GeoPosition,
    ) -> Result<()> {
        (**self).update_vehicle_position(vehicle_id, position).await
    }
}

/// Input device collaborator, polled once per manual frame
pub trait InputSource: Send {
    fn snapshot(&mut self) -> InputSnapshot;
}

/// Vehicles and waypoints currently known to the entity store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub vehicles: Vec<Vehicle>,
    /// Insertion order, which is also assignment order per vehicle
    pub waypoints: Vec<Waypoint>,
}

/// Entity collaborator, polled at the start of every tick and frame
pub trait EntitySource: Send {
    fn working_set(&self) -> WorkingSet;
}

impl<T: EntitySource + Sync + ?Sized> EntitySource for Arc<T> {
    fn working_set(&self) -> WorkingSet {
        (**self).working_set()
    }
}

/// Renderer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl SceneRenderer for NullRenderer {
    fn add_path(&mut self, _vehicle_id: &VehicleId, _style: PathStyle, _positions: &[GeoPosition]) {}
    fn clear_paths(&mut self) {}
    fn add_label(&mut self, _vehicle_id: &VehicleId, _position: &GeoPosition) {}
    fn request_redraw(&mut self) {}
}

/// One call made on a [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Path {
        vehicle_id: VehicleId,
        style: PathStyle,
        positions: Vec<GeoPosition>,
    },
    ClearPaths,
    Label {
        vehicle_id: VehicleId,
        position: GeoPosition,
    },
    Redraw,
}

/// Renderer that records every call; clones share the log
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of labels placed for `vehicle_id`
    pub fn label_count(&self, vehicle_id: &VehicleId) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RenderEvent::Label { vehicle_id: id, .. } if id == vehicle_id))
            .count()
    }

    fn record(&self, event: RenderEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl SceneRenderer for RecordingRenderer {
    fn add_path(&mut self, vehicle_id: &VehicleId, style: PathStyle, positions: &[GeoPosition]) {
        self.record(RenderEvent::Path {
            vehicle_id: vehicle_id.clone(),
            style,
            positions: positions.to_vec(),
        });
    }

    fn clear_paths(&mut self) {
        self.record(RenderEvent::ClearPaths);
    }

    fn add_label(&mut self, vehicle_id: &VehicleId, position: &GeoPosition) {
        self.record(RenderEvent::Label {
            vehicle_id: vehicle_id.clone(),
            position: *position,
        });
    }

    fn request_redraw(&mut self) {
        self.record(RenderEvent::Redraw);
    }
}

/// Input state shared with whatever thread reads the device
///
/// The device side calls [`SharedInput::set`]; the manual driver polls a
/// clone every frame.
#[derive(Debug, Default, Clone)]
pub struct SharedInput {
    state: Arc<Mutex<InputSnapshot>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, snapshot: InputSnapshot) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

impl InputSource for SharedInput {
    fn snapshot(&mut self) -> InputSnapshot {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
