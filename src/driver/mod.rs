//! Motion drivers
//!
//! A driver owns the stepping logic for one way of moving vehicles. Both
//! implement the [`Driver`] lifecycle:
//!
//! 1. `enter()` - called once when the driver takes over
//! 2. `update(dt)` - called once per tick or frame while active
//! 3. `exit()` - called once when the driver is stopped
//!
//! ## Available Drivers
//!
//! - **Autonomous**: every vehicle walks its assigned waypoints at a fixed
//!   speed on a fixed tick
//! - **Manual**: one operator-selected vehicle follows keyboard, analog and
//!   pad input on a frame loop
//!
//! Drivers never fail mid-tick. Missing entities are skipped and
//! persistence goes through the fire-and-forget [`PositionSink`].

pub mod autonomous;
pub mod manual;

pub use autonomous::AutonomousDriver;
pub use manual::ManualDriver;

use globe_fleet_core::control::InputSnapshot;
use globe_fleet_core::mission::{MotionState, WaypointId};
use globe_fleet_core::vehicle::VehicleId;

use crate::collaborators::SceneRenderer;
use crate::error::Result;
use crate::fleet::Fleet;
use crate::sink::PositionSink;

/// Collaborators lent to a driver for one call
pub struct DriveContext<'a> {
    pub renderer: &'a mut dyn SceneRenderer,
    pub sink: &'a PositionSink,
    /// Vehicle another driver currently owns; left untouched
    pub suspended: Option<&'a VehicleId>,
    /// Device input polled for this frame, if an input source is attached
    pub device_input: Option<InputSnapshot>,
}

/// Waypoint reached during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub vehicle_id: VehicleId,
    pub waypoint_id: WaypointId,
}

/// What one tick or frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Vehicles whose position changed
    pub moved: Vec<VehicleId>,
    /// Waypoints reached
    pub arrivals: Vec<Arrival>,
}

impl StepReport {
    pub fn is_idle(&self) -> bool {
        self.moved.is_empty() && self.arrivals.is_empty()
    }
}

/// Motion driver lifecycle
pub trait Driver {
    /// Take over (called once on activation)
    ///
    /// Returns `Err` if the driver cannot start, e.g. its vehicle is gone.
    fn enter(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>) -> Result<()>;

    /// Advance one step
    ///
    /// # Arguments
    ///
    /// * `dt` - Time since the previous step (seconds)
    fn update(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>, dt: f64) -> StepReport;

    /// Release (called once on deactivation); positions are never reverted
    fn exit(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>);

    /// Driver name for logging
    fn name(&self) -> &'static str;

    fn state(&self) -> MotionState;
}
