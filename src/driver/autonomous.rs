//! Autonomous Driver
//!
//! Moves every vehicle along its assigned waypoints at one fixed speed.
//!
//! # Behavior
//!
//! - On entry: reset path histories to the start positions, clear drawn
//!   paths, place one start label per vehicle (never twice)
//! - Each tick: step each vehicle toward its current waypoint; on arrival
//!   mark the waypoint passed, forward the position to the sink and move
//!   on to the next waypoint
//! - Vehicles without remaining waypoints stay where they are
//! - After each tick: redraw the traveled trail and the remaining route of
//!   every vehicle
//! - On exit: clear drawn paths; positions and passed flags are kept
//!
//! The step distance is fixed per tick (speed × tick interval), so a late
//! tick never covers more ground.

use std::collections::HashMap;

use globe_fleet_core::geo::{step_toward, GeoPosition};
use globe_fleet_core::mission::{MotionState, Waypoint, WaypointSequencer};
use globe_fleet_core::vehicle::{PathHistory, VehicleId};

use super::{Arrival, DriveContext, Driver, StepReport};
use crate::collaborators::PathStyle;
use crate::error::Result;
use crate::fleet::Fleet;

/// Autonomous waypoint-following driver
#[derive(Debug, Clone)]
pub struct AutonomousDriver {
    state: MotionState,
    /// Distance covered per tick (km)
    step_km: f64,
    sequencers: HashMap<VehicleId, WaypointSequencer>,
    histories: HashMap<VehicleId, PathHistory>,
    /// Ticks processed since the last `enter()`
    ticks: u64,
}

impl AutonomousDriver {
    /// Create an idle driver
    ///
    /// # Arguments
    ///
    /// * `step_km` - Distance each vehicle covers per tick
    pub fn new(step_km: f64) -> Self {
        Self {
            state: MotionState::Idle,
            step_km: if step_km.is_finite() { step_km.max(0.0) } else { 0.0 },
            sequencers: HashMap::new(),
            histories: HashMap::new(),
            ticks: 0,
        }
    }

    pub fn step_km(&self) -> f64 {
        self.step_km
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Trail recorded for a vehicle during the current (or last) run
    pub fn path_history(&self, vehicle_id: &VehicleId) -> Option<&PathHistory> {
        self.histories.get(vehicle_id)
    }

    /// Drop bookkeeping for vehicles that left the fleet
    pub fn forget(&mut self, vehicle_ids: &[VehicleId]) {
        for id in vehicle_ids {
            self.sequencers.remove(id);
            self.histories.remove(id);
        }
    }

    /// Start a trail for a vehicle seen for the first time this run
    ///
    /// The trail is seeded with the current position, and a start label is
    /// placed unless the vehicle already has one.
    fn track(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>, id: &VehicleId) {
        if self.histories.contains_key(id) {
            return;
        }
        let Some(vehicle) = fleet.vehicle_mut(id) else {
            return;
        };
        let mut history = PathHistory::new();
        history.reset(vehicle.position);
        self.histories.insert(id.clone(), history);

        if !vehicle.has_start_label {
            ctx.renderer.add_label(id, &vehicle.position);
            vehicle.has_start_label = true;
        }
    }

    /// Redraw the traveled trail and the remaining route of every vehicle
    fn draw(&self, fleet: &Fleet, ctx: &mut DriveContext<'_>) {
        ctx.renderer.clear_paths();

        for vehicle in fleet.vehicles() {
            if let Some(history) = self.histories.get(&vehicle.id) {
                if history.len() >= 2 {
                    ctx.renderer
                        .add_path(&vehicle.id, PathStyle::Traveled, history.points());
                }
            }

            let assigned = fleet.assigned(&vehicle.id);
            let ahead: Vec<&Waypoint> = match self.sequencers.get(&vehicle.id) {
                Some(seq) => seq.remaining(&assigned).to_vec(),
                None => assigned.iter().copied().filter(|wp| !wp.is_passed).collect(),
            };
            let mut route: Vec<GeoPosition> = Vec::with_capacity(ahead.len() + 1);
            route.push(vehicle.position);
            route.extend(ahead.iter().map(|wp| wp.position));
            if route.len() >= 2 {
                ctx.renderer
                    .add_path(&vehicle.id, PathStyle::Planned, &route);
            }
        }

        ctx.renderer.request_redraw();
    }
}

impl Driver for AutonomousDriver {
    fn enter(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>) -> Result<()> {
        self.state = MotionState::Running;
        self.ticks = 0;
        self.sequencers.clear();
        self.histories.clear();

        ctx.renderer.clear_paths();

        for id in fleet.vehicle_ids() {
            self.track(fleet, ctx, &id);
        }

        ctx.renderer.request_redraw();

        crate::log_info!(
            "Autonomous driver started: {} vehicles, {:.5} km per tick",
            fleet.vehicles().len(),
            self.step_km
        );
        Ok(())
    }

    fn update(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>, _dt: f64) -> StepReport {
        let mut report = StepReport::default();
        if !self.state.is_running() {
            return report;
        }
        self.ticks += 1;

        for id in fleet.vehicle_ids() {
            self.track(fleet, ctx, &id);

            // Synced even while suspended so the drawn route follows edits
            let seq = self.sequencers.entry(id.clone()).or_default();
            let target = {
                let assigned = fleet.assigned(&id);
                seq.current(&assigned)
                    .map(|idx| (assigned[idx].id.clone(), assigned[idx].position))
            };
            if ctx.suspended == Some(&id) {
                continue;
            }
            let Some((waypoint_id, target_position)) = target else {
                continue;
            };

            let Some(vehicle) = fleet.vehicle_mut(&id) else {
                continue;
            };
            let previous = vehicle.position;
            let next = step_toward(&previous, &target_position, self.step_km);
            let arrived = next == target_position;
            vehicle.position = next;

            if let Some(history) = self.histories.get_mut(&id) {
                history.push(next);
            }

            if next != previous {
                report.moved.push(id.clone());
            }

            if arrived {
                if let Some(waypoint) = fleet.waypoint_mut(&waypoint_id) {
                    waypoint.is_passed = true;
                }
                seq.advance();
                ctx.sink.submit(&id, next);
                crate::log_info!("{} reached waypoint {}", id, waypoint_id);
                report.arrivals.push(Arrival {
                    vehicle_id: id,
                    waypoint_id,
                });
            }
        }

        self.draw(fleet, ctx);
        report
    }

    fn exit(&mut self, _fleet: &mut Fleet, ctx: &mut DriveContext<'_>) {
        if !self.state.is_running() {
            return;
        }
        self.state = MotionState::Idle;
        ctx.renderer.clear_paths();
        ctx.renderer.request_redraw();
        crate::log_info!("Autonomous driver stopped after {} ticks", self.ticks);
    }

    fn name(&self) -> &'static str {
        "Autonomous"
    }

    fn state(&self) -> MotionState {
        self.state
    }
}
