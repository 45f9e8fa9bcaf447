//! Shared simulation state
//!
//! Everything the two motion loops mutate lives here, behind the arbiter's
//! single lock. Every method is synchronous; a tick or frame runs to
//! completion without yielding.
//!
//! ## Ownership rules
//!
//! - The autonomous driver moves every vehicle except the one under manual
//!   control
//! - At most one manual session exists; selecting another vehicle ends the
//!   previous session first
//! - Entity changes are picked up at the start of every tick, frame and
//!   control call

use globe_fleet_core::control::{AnalogAxes, Directions};
use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::mission::{Waypoint, WaypointId, WaypointSequencer};
use globe_fleet_core::traits::TimeSource;
use globe_fleet_core::vehicle::{PathHistory, VehicleId};

use crate::collaborators::{EntitySource, InputSource, NullRenderer, SceneRenderer};
use crate::driver::{AutonomousDriver, DriveContext, Driver, ManualDriver, StepReport};
use crate::error::{FleetError, Result};
use crate::fleet::{Fleet, ReconcileReport};
use crate::parameters::MotionParams;
use crate::sink::PositionSink;

/// Result of a manual selection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlChange {
    /// Vehicle now under manual control; `released` lost control to it
    Acquired {
        vehicle_id: VehicleId,
        released: Option<VehicleId>,
    },
    /// Selecting the controlled vehicle again ended its session
    Released(VehicleId),
}

/// Simulation state shared by the motion loops
pub struct Simulation<T: TimeSource> {
    fleet: Fleet,
    params: MotionParams,
    autonomous: AutonomousDriver,
    manual: Option<ManualDriver>,
    renderer: Box<dyn SceneRenderer>,
    sink: PositionSink,
    entities: Option<Box<dyn EntitySource>>,
    input: Option<Box<dyn InputSource>>,
    clock: T,
    /// Timestamp of the previous manual frame (None = next frame is the first)
    last_frame_us: Option<u64>,
}

impl<T: TimeSource> Simulation<T> {
    /// Create a simulation with no renderer, persistence or entity source
    pub fn new(fleet: Fleet, params: MotionParams, clock: T) -> Self {
        let params = params.validated();
        Self {
            fleet,
            autonomous: AutonomousDriver::new(params.autonomous_step_km()),
            params,
            manual: None,
            renderer: Box::new(NullRenderer),
            sink: PositionSink::disabled(),
            entities: None,
            input: None,
            clock,
            last_frame_us: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl SceneRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_sink(mut self, sink: PositionSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_entity_source(mut self, entities: impl EntitySource + 'static) -> Self {
        self.entities = Some(Box::new(entities));
        self
    }

    pub fn with_input_source(mut self, input: impl InputSource + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    // -- Queries --

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn sink(&self) -> &PositionSink {
        &self.sink
    }

    pub fn is_autonomous_running(&self) -> bool {
        self.autonomous.state().is_running()
    }

    pub fn autonomous_ticks(&self) -> u64 {
        self.autonomous.ticks()
    }

    /// Vehicle currently under manual control
    pub fn manual_vehicle(&self) -> Option<&VehicleId> {
        self.manual.as_ref().map(ManualDriver::vehicle_id)
    }

    pub fn vehicle_position(&self, vehicle_id: &VehicleId) -> Option<GeoPosition> {
        self.fleet.position(vehicle_id)
    }

    pub fn waypoint(&self, waypoint_id: &WaypointId) -> Option<&Waypoint> {
        self.fleet.waypoint(waypoint_id)
    }

    pub fn path_history(&self, vehicle_id: &VehicleId) -> Option<&PathHistory> {
        self.autonomous.path_history(vehicle_id)
    }

    /// Waypoints passed and total for a vehicle
    pub fn progress(&self, vehicle_id: &VehicleId) -> (usize, usize) {
        WaypointSequencer::progress(&self.fleet.assigned(vehicle_id))
    }

    // -- Entity synchronization --

    /// Pull the latest working set from the entity source, if any
    pub fn sync_entities(&mut self) -> ReconcileReport {
        let Some(entities) = &self.entities else {
            return ReconcileReport::default();
        };
        let report = self.fleet.reconcile(entities.working_set());

        if !report.vehicles_removed.is_empty() {
            for id in &report.vehicles_removed {
                crate::log_info!("Vehicle {} left the working set", id);
            }
            self.autonomous.forget(&report.vehicles_removed);

            let lost_manual = self
                .manual
                .as_ref()
                .is_some_and(|m| report.vehicles_removed.contains(m.vehicle_id()));
            if lost_manual {
                crate::log_warn!("Manually controlled vehicle vanished, ending session");
                self.end_manual_session();
            }
        }
        for id in &report.vehicles_added {
            crate::log_debug!("Vehicle {} joined the working set", id);
        }
        report
    }

    // -- Autonomous control --

    /// Idle → Running; no effect if already running
    pub fn start_autonomous(&mut self) -> Result<()> {
        if self.is_autonomous_running() {
            crate::log_debug!("{} driver already running", self.autonomous.name());
            return Ok(());
        }
        self.sync_entities();

        let suspended = self.manual.as_ref().map(ManualDriver::vehicle_id);
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended,
            device_input: None,
        };
        self.autonomous.enter(&mut self.fleet, &mut ctx)?;
        crate::log_debug!("{} driver engaged", self.autonomous.name());
        Ok(())
    }

    /// Running → Idle; returns whether it was running
    pub fn stop_autonomous(&mut self) -> bool {
        if !self.is_autonomous_running() {
            return false;
        }
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended: None,
            device_input: None,
        };
        self.autonomous.exit(&mut self.fleet, &mut ctx);
        crate::log_debug!("{} driver released", self.autonomous.name());
        true
    }

    /// One autonomous tick (no-op unless running)
    pub fn autonomous_tick(&mut self) -> StepReport {
        if !self.is_autonomous_running() {
            return StepReport::default();
        }
        self.sync_entities();

        let dt = self.params.tick_interval().as_secs_f64();
        let suspended = self.manual.as_ref().map(ManualDriver::vehicle_id);
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended,
            device_input: None,
        };
        let report = self.autonomous.update(&mut self.fleet, &mut ctx, dt);

        if !report.arrivals.is_empty() {
            crate::log_debug!(
                "Tick {}: {} moved, {} arrivals",
                self.autonomous.ticks(),
                report.moved.len(),
                report.arrivals.len()
            );
        }
        report
    }

    // -- Manual control --

    /// Toggle manual control of `vehicle_id`
    ///
    /// Selecting the controlled vehicle releases it. Selecting another
    /// vehicle ends the current session (held input is cleared) and starts
    /// a new one.
    ///
    /// # Errors
    ///
    /// `FleetError::VehicleNotFound` if the vehicle is not in the working
    /// set; the current session is left untouched.
    pub fn select_for_manual_control(&mut self, vehicle_id: &VehicleId) -> Result<ControlChange> {
        self.sync_entities();

        if self.manual_vehicle() == Some(vehicle_id) {
            self.end_manual_session();
            return Ok(ControlChange::Released(vehicle_id.clone()));
        }

        if !self.fleet.contains_vehicle(vehicle_id) {
            return Err(FleetError::VehicleNotFound(vehicle_id.clone()));
        }

        let released = self.end_manual_session();

        let mut driver = ManualDriver::new(vehicle_id.clone(), self.params.manual_step_config());
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended: None,
            device_input: None,
        };
        driver.enter(&mut self.fleet, &mut ctx)?;
        crate::log_debug!("{} driver engaged for {}", driver.name(), vehicle_id);
        self.manual = Some(driver);
        self.last_frame_us = None;

        Ok(ControlChange::Acquired {
            vehicle_id: vehicle_id.clone(),
            released,
        })
    }

    /// End the manual session, if any
    pub fn release_manual_control(&mut self) -> Option<VehicleId> {
        self.end_manual_session()
    }

    fn end_manual_session(&mut self) -> Option<VehicleId> {
        let mut driver = self.manual.take()?;
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended: None,
            device_input: None,
        };
        driver.exit(&mut self.fleet, &mut ctx);
        self.last_frame_us = None;
        crate::log_debug!("{} driver released {}", driver.name(), driver.vehicle_id());
        Some(driver.vehicle_id().clone())
    }

    /// Direction key pressed; returns false when no session is active
    pub fn key_down(&mut self, direction: Directions) -> bool {
        match self.manual.as_mut() {
            Some(driver) => {
                driver.key_down(direction);
                true
            }
            None => {
                crate::log_trace!("Key press ignored, no manual session");
                false
            }
        }
    }

    /// Direction key released
    pub fn key_up(&mut self, direction: Directions) {
        if let Some(driver) = self.manual.as_mut() {
            driver.key_up(direction);
        }
    }

    /// Analog stick sample
    pub fn set_analog(&mut self, axes: AnalogAxes) {
        if let Some(driver) = self.manual.as_mut() {
            driver.set_analog(axes);
        }
    }

    /// Pad buttons currently pressed
    pub fn set_pad(&mut self, buttons: Directions) {
        if let Some(driver) = self.manual.as_mut() {
            driver.set_pad(buttons);
        }
    }

    /// One manual frame at the clock's current time (no-op without a session)
    pub fn manual_frame(&mut self) -> StepReport {
        if self.manual.is_none() {
            return StepReport::default();
        }
        self.sync_entities();

        let now_us = self.clock.now_us();
        let dt = self.frame_dt(now_us);
        let device_input = self.input.as_mut().map(|source| source.snapshot());

        let Some(driver) = self.manual.as_mut() else {
            return StepReport::default();
        };
        let mut ctx = DriveContext {
            renderer: self.renderer.as_mut(),
            sink: &self.sink,
            suspended: None,
            device_input,
        };
        driver.update(&mut self.fleet, &mut ctx, dt)
    }

    /// Measured frame time, capped; the first frame uses the nominal rate
    fn frame_dt(&mut self, now_us: u64) -> f64 {
        let dt = match self.last_frame_us {
            None => self.params.nominal_frame_dt_s(),
            Some(last_us) => now_us.saturating_sub(last_us) as f64 / 1_000_000.0,
        };
        self.last_frame_us = Some(now_us);
        dt.min(self.params.max_frame_dt_s)
    }
}
