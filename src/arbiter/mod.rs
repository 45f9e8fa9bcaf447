//! Motion Arbiter
//!
//! Owns the shared [`Simulation`] and the tokio tasks that drive it.
//!
//! ## Responsibilities
//!
//! - Run the autonomous loop (fixed interval, missed ticks skipped)
//! - Run the manual frame loop while a session is active
//! - Route control calls (start/stop, selection, input events) to the
//!   simulation under the same lock the loops use
//!
//! ## Concurrency
//!
//! One `std::sync::Mutex` guards the simulation. Each loop iteration takes
//! the lock for exactly one synchronous tick or frame, so a task abort can
//! only land between ticks. Stopping also flips the driver state under the
//! lock, which turns any tick that already won the race into a no-op.
//! Poisoned locks are recovered; a panicking tick leaves the state as it
//! was at the panic point.

pub mod simulation;

pub use simulation::{ControlChange, Simulation};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use globe_fleet_core::control::{AnalogAxes, Directions};
use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::mission::{Waypoint, WaypointId};
use globe_fleet_core::traits::TimeSource;
use globe_fleet_core::vehicle::{PathHistory, VehicleId};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::TokioClock;
use crate::driver::StepReport;
use crate::error::{FleetError, Result};
use crate::fleet::Fleet;

fn lock<T: TimeSource>(shared: &Mutex<Simulation<T>>) -> MutexGuard<'_, Simulation<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single write authority over vehicle positions
pub struct MotionArbiter<T: TimeSource + 'static = TokioClock> {
    shared: Arc<Mutex<Simulation<T>>>,
    tick_interval: Duration,
    frame_interval: Duration,
    autonomous_task: Option<JoinHandle<()>>,
    manual_task: Option<JoinHandle<()>>,
}

impl<T: TimeSource + 'static> MotionArbiter<T> {
    pub fn new(simulation: Simulation<T>) -> Self {
        let tick_interval = simulation.params().tick_interval();
        let frame_interval = simulation.params().frame_interval();
        Self {
            shared: Arc::new(Mutex::new(simulation)),
            tick_interval,
            frame_interval,
            autonomous_task: None,
            manual_task: None,
        }
    }

    /// Run `f` with the simulation locked
    pub fn with_simulation<R>(&self, f: impl FnOnce(&mut Simulation<T>) -> R) -> R {
        f(&mut lock(&self.shared))
    }

    // -- Autonomous mode --

    /// Start the autonomous driver and its tick loop
    ///
    /// # Errors
    ///
    /// `FleetError::RuntimeUnavailable` outside a tokio runtime.
    pub fn start_autonomous(&mut self) -> Result<()> {
        let handle =
            Handle::try_current().map_err(|_| FleetError::RuntimeUnavailable("autonomous loop"))?;
        lock(&self.shared).start_autonomous()?;

        if is_alive(&self.autonomous_task) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let period = self.tick_interval;
        self.autonomous_task = Some(handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mut sim = lock(&shared);
                if !sim.is_autonomous_running() {
                    break;
                }
                sim.autonomous_tick();
            }
        }));
        crate::log_info!("Autonomous loop started ({} ms)", period.as_millis());
        Ok(())
    }

    /// Stop the autonomous driver; positions and passed flags are kept
    pub fn stop_autonomous(&mut self) {
        if let Some(task) = self.autonomous_task.take() {
            task.abort();
        }
        if lock(&self.shared).stop_autonomous() {
            crate::log_info!("Autonomous loop stopped");
        }
    }

    /// Flip the autonomous driver; returns whether it is now running
    pub fn toggle_autonomous(&mut self) -> Result<bool> {
        if self.is_autonomous_running() {
            self.stop_autonomous();
            Ok(false)
        } else {
            self.start_autonomous()?;
            Ok(true)
        }
    }

    pub fn is_autonomous_running(&self) -> bool {
        lock(&self.shared).is_autonomous_running()
    }

    // -- Manual mode --

    /// Toggle manual control of `vehicle_id`
    ///
    /// Acquiring control starts the frame loop if it is not running;
    /// releasing control stops it.
    ///
    /// # Errors
    ///
    /// - `FleetError::VehicleNotFound` if the vehicle is unknown
    /// - `FleetError::RuntimeUnavailable` if a session would start outside
    ///   a tokio runtime (the selection is rolled back)
    pub fn select_for_manual_control(&mut self, vehicle_id: &VehicleId) -> Result<ControlChange> {
        let change = lock(&self.shared).select_for_manual_control(vehicle_id)?;

        match &change {
            ControlChange::Acquired { vehicle_id, .. } => {
                if let Err(e) = self.ensure_manual_loop() {
                    lock(&self.shared).release_manual_control();
                    return Err(e);
                }
                crate::log_info!("Manual control: {}", vehicle_id);
            }
            ControlChange::Released(vehicle_id) => {
                self.abort_manual_loop();
                crate::log_info!("Manual control released: {}", vehicle_id);
            }
        }
        Ok(change)
    }

    /// End the manual session, if any
    pub fn release_manual_control(&mut self) -> Option<VehicleId> {
        self.abort_manual_loop();
        lock(&self.shared).release_manual_control()
    }

    pub fn manual_vehicle(&self) -> Option<VehicleId> {
        lock(&self.shared).manual_vehicle().cloned()
    }

    /// Direction key pressed; ignored (returns false) without a session
    pub fn key_down(&self, direction: Directions) -> bool {
        lock(&self.shared).key_down(direction)
    }

    /// Direction key released
    pub fn key_up(&self, direction: Directions) {
        lock(&self.shared).key_up(direction);
    }

    /// Analog stick sample
    pub fn set_analog(&self, x: f64, y: f64) {
        lock(&self.shared).set_analog(AnalogAxes::new(x, y));
    }

    /// Pad buttons currently pressed
    pub fn set_pad(&self, buttons: Directions) {
        lock(&self.shared).set_pad(buttons);
    }

    fn ensure_manual_loop(&mut self) -> Result<()> {
        if is_alive(&self.manual_task) {
            return Ok(());
        }
        let handle =
            Handle::try_current().map_err(|_| FleetError::RuntimeUnavailable("manual loop"))?;

        let shared = Arc::clone(&self.shared);
        let period = self.frame_interval;
        self.manual_task = Some(handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mut sim = lock(&shared);
                if sim.manual_vehicle().is_none() {
                    break;
                }
                sim.manual_frame();
            }
        }));
        Ok(())
    }

    fn abort_manual_loop(&mut self) {
        if let Some(task) = self.manual_task.take() {
            task.abort();
        }
    }

    // -- Deterministic stepping --

    /// Run one autonomous tick now (no-op unless autonomous is running)
    pub fn autonomous_tick(&self) -> StepReport {
        lock(&self.shared).autonomous_tick()
    }

    /// Run one manual frame now (no-op without a session)
    pub fn manual_frame(&self) -> StepReport {
        lock(&self.shared).manual_frame()
    }

    // -- Queries --

    pub fn vehicle_position(&self, vehicle_id: &VehicleId) -> Option<GeoPosition> {
        lock(&self.shared).vehicle_position(vehicle_id)
    }

    pub fn waypoint(&self, waypoint_id: &WaypointId) -> Option<Waypoint> {
        lock(&self.shared).waypoint(waypoint_id).cloned()
    }

    pub fn path_history(&self, vehicle_id: &VehicleId) -> Option<PathHistory> {
        lock(&self.shared).path_history(vehicle_id).cloned()
    }

    /// Copy of the current working set
    pub fn fleet(&self) -> Fleet {
        lock(&self.shared).fleet().clone()
    }

    /// Stop both loops and drain the position sink
    pub async fn shutdown(mut self) {
        self.stop_autonomous();
        self.release_manual_control();
        let sink = lock(&self.shared).sink().clone();
        sink.shutdown().await;
        crate::log_debug!("Motion arbiter shut down, sink stats {:?}", sink.stats());
    }
}

impl<T: TimeSource + 'static> Drop for MotionArbiter<T> {
    fn drop(&mut self) {
        if let Some(task) = self.autonomous_task.take() {
            task.abort();
        }
        self.abort_manual_loop();
    }
}

fn is_alive(task: &Option<JoinHandle<()>>) -> bool {
    task.as_ref().is_some_and(|t| !t.is_finished())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::WorkingSet;
    use crate::parameters::MotionParams;
    use globe_fleet_core::vehicle::Vehicle;

    fn arbiter() -> MotionArbiter {
        let fleet = Fleet::from_working_set(WorkingSet {
            vehicles: vec![Vehicle::new("v1", GeoPosition::new(0.0, 0.0))],
            waypoints: vec![Waypoint::new("w1", GeoPosition::new(1.0, 0.0)).assigned("v1")],
        });
        MotionArbiter::new(Simulation::new(
            fleet,
            MotionParams::default(),
            TokioClock::new(),
        ))
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut arbiter = arbiter();
        let err = arbiter.start_autonomous().unwrap_err();
        assert!(matches!(err, FleetError::RuntimeUnavailable(_)));
        assert!(!arbiter.is_autonomous_running());
    }

    #[test]
    fn test_manual_select_outside_runtime_rolls_back() {
        let mut arbiter = arbiter();
        let err = arbiter
            .select_for_manual_control(&VehicleId::from("v1"))
            .unwrap_err();
        assert!(matches!(err, FleetError::RuntimeUnavailable(_)));
        assert!(arbiter.manual_vehicle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autonomous_loop_ticks_every_interval() {
        let mut arbiter = arbiter();
        let v1 = VehicleId::from("v1");
        arbiter.start_autonomous().unwrap();

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let ticks = arbiter.with_simulation(|sim| sim.autonomous_ticks());
        assert_eq!(ticks, 10);

        arbiter.stop_autonomous();
        let stopped_at = arbiter.vehicle_position(&v1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(arbiter.vehicle_position(&v1), stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let mut arbiter = arbiter();
        assert!(arbiter.toggle_autonomous().unwrap());
        assert!(arbiter.is_autonomous_running());
        assert!(!arbiter.toggle_autonomous().unwrap());
        assert!(!arbiter.is_autonomous_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_loop_runs_until_released() {
        let mut arbiter = arbiter();
        let v1 = VehicleId::from("v1");
        let start = arbiter.vehicle_position(&v1).unwrap();

        arbiter.select_for_manual_control(&v1).unwrap();
        arbiter.key_down(Directions::RIGHT);
        tokio::time::sleep(Duration::from_millis(500)).await;
        let moved = arbiter.vehicle_position(&v1).unwrap();
        assert!(moved.longitude > start.longitude);

        arbiter.select_for_manual_control(&v1).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(arbiter.vehicle_position(&v1), Some(moved));
        assert!(!arbiter.key_down(Directions::RIGHT));
    }
}
