use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use globe_fleet::collaborators::{MemoryEntityStore, PositionStore, SharedInput, WorkingSet};
use globe_fleet::{
    Directions, FleetError, Fleet, GeoPosition, InputSnapshot, MotionParams, PositionSink,
    Result, Simulation, Vehicle, VehicleId, Waypoint,
};
use globe_fleet_core::traits::MockTime;

const FRAME_US: u64 = 16_667;

/// Store double that records writes and can be switched to failing
#[derive(Default)]
struct RecordingStore {
    writes: Mutex<Vec<(VehicleId, GeoPosition)>>,
    failing: Mutex<bool>,
}

impl RecordingStore {
    fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn writes(&self) -> Vec<(VehicleId, GeoPosition)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionStore for RecordingStore {
    async fn update_vehicle_position(
        &self,
        vehicle_id: &VehicleId,
        position: GeoPosition,
    ) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(FleetError::Persistence("backend unavailable".into()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((vehicle_id.clone(), position));
        Ok(())
    }
}

fn single_vehicle(waypoints: Vec<Waypoint>) -> Fleet {
    Fleet::from_working_set(WorkingSet {
        vehicles: vec![Vehicle::new("v1", GeoPosition::new(0.0, 0.0))],
        waypoints,
    })
}

#[tokio::test]
async fn test_manual_frames_are_persisted() {
    let store = Arc::new(RecordingStore::default());
    let sink = PositionSink::spawn(store.clone()).unwrap();
    let clock = MockTime::new();
    let mut sim = Simulation::new(single_vehicle(Vec::new()), MotionParams::default(), clock.clone())
        .with_sink(sink.clone());
    let v1 = VehicleId::from("v1");

    sim.select_for_manual_control(&v1).unwrap();
    sim.key_down(Directions::UP);
    for _ in 0..5 {
        clock.advance(FRAME_US);
        sim.manual_frame();
    }
    sink.flush().await;

    // Frames queued faster than the worker ran: coalesced to the latest
    let writes = store.writes();
    assert_eq!(writes.last().map(|w| w.1), sim.vehicle_position(&v1));
    assert_eq!(sink.stats().submitted, 5);
    assert_eq!(sink.stats().written + sink.stats().coalesced, 5);
}

#[tokio::test]
async fn test_store_failure_keeps_local_position() {
    let store = Arc::new(RecordingStore::default());
    store.set_failing(true);
    let sink = PositionSink::spawn(store.clone()).unwrap();
    let clock = MockTime::new();
    let mut sim = Simulation::new(single_vehicle(Vec::new()), MotionParams::default(), clock.clone())
        .with_sink(sink.clone());
    let v1 = VehicleId::from("v1");

    sim.select_for_manual_control(&v1).unwrap();
    sim.key_down(Directions::RIGHT);
    sim.manual_frame();
    sink.flush().await;

    let moved = sim.vehicle_position(&v1).unwrap();
    assert!(moved.longitude > 0.0);
    assert_eq!(sink.stats().failed, 1);
    assert!(store.writes().is_empty());

    // Recovery: later updates go through, nothing is rolled back
    store.set_failing(false);
    clock.advance(FRAME_US);
    sim.manual_frame();
    sink.flush().await;
    assert_eq!(store.writes().len(), 1);
    assert!(sim.vehicle_position(&v1).unwrap().longitude > moved.longitude);
}

#[tokio::test]
async fn test_arrivals_are_forwarded_to_store() {
    let entities = Arc::new(MemoryEntityStore::default());
    let v = entities.create_vehicle("Rover", GeoPosition::new(0.0, 0.0));
    let w = entities.create_waypoint(GeoPosition::new(0.001, 0.0));
    entities.assign_waypoint(&w, Some(&v)).unwrap();

    let sink = PositionSink::spawn(entities.clone()).unwrap();
    let mut sim = Simulation::new(Fleet::new(), MotionParams::default(), MockTime::new())
        .with_entity_source(entities.clone())
        .with_sink(sink.clone());

    sim.start_autonomous().unwrap();
    let mut arrived = false;
    for _ in 0..50 {
        arrived |= !sim.autonomous_tick().arrivals.is_empty();
    }
    assert!(arrived);
    sink.flush().await;

    assert_eq!(
        entities.vehicle(&v).unwrap().position,
        GeoPosition::new(0.001, 0.0)
    );
    assert_eq!(sink.stats().written, 1);
}

#[tokio::test]
async fn test_unknown_vehicle_in_store_is_logged_not_fatal() {
    // Store has no vehicles, so every write fails with VehicleNotFound
    let entities = Arc::new(MemoryEntityStore::default());
    let sink = PositionSink::spawn(entities).unwrap();
    let clock = MockTime::new();
    let mut sim = Simulation::new(single_vehicle(Vec::new()), MotionParams::default(), clock.clone())
        .with_sink(sink.clone());
    let v1 = VehicleId::from("v1");

    sim.select_for_manual_control(&v1).unwrap();
    sim.key_down(Directions::DOWN);
    sim.manual_frame();
    sink.flush().await;

    assert_eq!(sink.stats().failed, 1);
    assert!(sim.vehicle_position(&v1).unwrap().latitude < 0.0);
}

#[tokio::test]
async fn test_device_input_source_drives_frames() {
    let device = SharedInput::new();
    let clock = MockTime::new();
    let mut sim = Simulation::new(single_vehicle(Vec::new()), MotionParams::default(), clock.clone())
        .with_input_source(device.clone());
    let v1 = VehicleId::from("v1");
    sim.select_for_manual_control(&v1).unwrap();

    assert!(sim.manual_frame().is_idle());

    device.set(InputSnapshot {
        pad: Directions::LEFT,
        ..Default::default()
    });
    clock.advance(FRAME_US);
    let report = sim.manual_frame();

    assert_eq!(report.moved, vec![v1.clone()]);
    assert!(sim.vehicle_position(&v1).unwrap().longitude < 0.0);
}

#[tokio::test]
async fn test_shutdown_drains_pending_updates() {
    let store = Arc::new(RecordingStore::default());
    let sink = PositionSink::spawn(store.clone()).unwrap();
    let clock = MockTime::new();
    let mut sim = Simulation::new(single_vehicle(Vec::new()), MotionParams::default(), clock.clone())
        .with_sink(sink.clone());
    let v1 = VehicleId::from("v1");

    sim.select_for_manual_control(&v1).unwrap();
    sim.key_down(Directions::UP);
    sim.manual_frame();
    sink.shutdown().await;

    assert_eq!(store.writes().len(), 1);
    clock.advance(FRAME_US);
    sim.manual_frame();
    assert_eq!(sink.stats().dropped, 1);
}
