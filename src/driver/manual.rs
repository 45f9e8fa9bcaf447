//! Manual Driver
//!
//! Operator control of a single selected vehicle.
//!
//! ## Behavior
//!
//! - Keyboard (held direction keys), one analog stick and a four-button pad
//!   add up to one displacement per frame
//! - Step length follows the measured frame time, so the vehicle covers the
//!   same ground per second at any frame rate
//! - Each moved frame writes the live position, forwards it to the sink and
//!   requests a redraw
//! - Frames without input do nothing
//! - Exit clears held input; the position is never reverted
//!
//! Input arrives two ways: discrete events (`key_down`, `set_analog`, ...)
//! kept by the driver, and an optional device snapshot polled every frame.
//! Both are merged before stepping.

use globe_fleet_core::control::{
    apply_displacement, manual_displacement, AnalogAxes, Directions, InputSnapshot,
    ManualStepConfig,
};
use globe_fleet_core::mission::MotionState;
use globe_fleet_core::vehicle::VehicleId;

use super::{DriveContext, Driver, StepReport};
use crate::error::{FleetError, Result};
use crate::fleet::Fleet;

/// Manual control session for one vehicle
#[derive(Debug, Clone)]
pub struct ManualDriver {
    vehicle_id: VehicleId,
    state: MotionState,
    /// Input built from discrete events
    input: InputSnapshot,
    config: ManualStepConfig,
    frames: u64,
}

impl ManualDriver {
    pub fn new(vehicle_id: VehicleId, config: ManualStepConfig) -> Self {
        Self {
            vehicle_id,
            state: MotionState::Idle,
            input: InputSnapshot::default(),
            config,
            frames: 0,
        }
    }

    /// Vehicle under control
    pub fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle_id
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Event-driven input currently held
    pub fn input(&self) -> InputSnapshot {
        self.input
    }

    /// Direction key pressed (ignored unless the session is active)
    pub fn key_down(&mut self, direction: Directions) {
        if self.state.is_running() {
            self.input.held_keys.insert(direction);
        }
    }

    /// Direction key released
    pub fn key_up(&mut self, direction: Directions) {
        self.input.held_keys.remove(direction);
    }

    /// Latest analog stick sample (x, y in [-1, 1])
    pub fn set_analog(&mut self, axes: AnalogAxes) {
        if self.state.is_running() {
            self.input.analog = axes;
        }
    }

    /// Pad buttons currently pressed
    pub fn set_pad(&mut self, buttons: Directions) {
        if self.state.is_running() {
            self.input.pad = buttons;
        }
    }

    fn merged_input(&self, device: Option<InputSnapshot>) -> InputSnapshot {
        let Some(device) = device else {
            return self.input;
        };
        InputSnapshot {
            held_keys: self.input.held_keys | device.held_keys,
            analog: if device.analog == AnalogAxes::default() {
                self.input.analog
            } else {
                device.analog
            },
            pad: self.input.pad | device.pad,
        }
    }
}

impl Driver for ManualDriver {
    fn enter(&mut self, fleet: &mut Fleet, _ctx: &mut DriveContext<'_>) -> Result<()> {
        if !fleet.contains_vehicle(&self.vehicle_id) {
            return Err(FleetError::VehicleNotFound(self.vehicle_id.clone()));
        }
        self.state = MotionState::Running;
        self.input = InputSnapshot::default();
        self.frames = 0;
        crate::log_info!("Manual control of {} started", self.vehicle_id);
        Ok(())
    }

    fn update(&mut self, fleet: &mut Fleet, ctx: &mut DriveContext<'_>, dt: f64) -> StepReport {
        let mut report = StepReport::default();
        if !self.state.is_running() {
            return report;
        }
        self.frames += 1;

        let input = self.merged_input(ctx.device_input);
        if input.is_neutral() {
            return report;
        }

        let Some(vehicle) = fleet.vehicle_mut(&self.vehicle_id) else {
            crate::log_debug!("Manual vehicle {} not in working set", self.vehicle_id);
            return report;
        };

        let displacement =
            manual_displacement(vehicle.position.latitude, &input, dt, &self.config);
        if displacement.is_zero() {
            return report;
        }

        let next = apply_displacement(&vehicle.position, &displacement);
        if next == vehicle.position {
            return report;
        }
        vehicle.position = next;

        ctx.sink.submit(&self.vehicle_id, next);
        ctx.renderer.request_redraw();
        report.moved.push(self.vehicle_id.clone());
        report
    }

    fn exit(&mut self, _fleet: &mut Fleet, _ctx: &mut DriveContext<'_>) {
        if !self.state.is_running() {
            return;
        }
        self.state = MotionState::Idle;
        self.input = InputSnapshot::default();
        crate::log_info!(
            "Manual control of {} stopped after {} frames",
            self.vehicle_id,
            self.frames
        );
    }

    fn name(&self) -> &'static str {
        "Manual"
    }

    fn state(&self) -> MotionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{RecordingRenderer, RenderEvent, WorkingSet};
    use crate::sink::PositionSink;
    use globe_fleet_core::geo::{distance_km, GeoPosition};
    use globe_fleet_core::vehicle::Vehicle;

    const FRAME_DT: f64 = 1.0 / 60.0;

    fn fleet_at(position: GeoPosition) -> Fleet {
        Fleet::from_working_set(WorkingSet {
            vehicles: vec![Vehicle::new("v1", position)],
            waypoints: Vec::new(),
        })
    }

    fn run_frame(
        driver: &mut ManualDriver,
        fleet: &mut Fleet,
        renderer: &mut RecordingRenderer,
        device_input: Option<InputSnapshot>,
    ) -> StepReport {
        let sink = PositionSink::disabled();
        let mut ctx = DriveContext {
            renderer,
            sink: &sink,
            suspended: None,
            device_input,
        };
        driver.update(fleet, &mut ctx, FRAME_DT)
    }

    fn active_driver(fleet: &mut Fleet) -> ManualDriver {
        let mut driver = ManualDriver::new(VehicleId::from("v1"), ManualStepConfig::default());
        let sink = PositionSink::disabled();
        let mut renderer = RecordingRenderer::new();
        let mut ctx = DriveContext {
            renderer: &mut renderer,
            sink: &sink,
            suspended: None,
            device_input: None,
        };
        driver.enter(fleet, &mut ctx).unwrap();
        driver
    }

    fn frame_distance(keys: Directions) -> f64 {
        let start = GeoPosition::new(0.0, 0.0);
        let mut fleet = fleet_at(start);
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        driver.key_down(keys);
        run_frame(&mut driver, &mut fleet, &mut renderer, None);

        distance_km(&start, &fleet.position(&VehicleId::from("v1")).unwrap())
    }

    #[test]
    fn test_enter_unknown_vehicle_fails() {
        let mut fleet = fleet_at(GeoPosition::default());
        let mut driver = ManualDriver::new(VehicleId::from("ghost"), ManualStepConfig::default());
        let sink = PositionSink::disabled();
        let mut renderer = RecordingRenderer::new();
        let mut ctx = DriveContext {
            renderer: &mut renderer,
            sink: &sink,
            suspended: None,
            device_input: None,
        };

        let err = driver.enter(&mut fleet, &mut ctx).unwrap_err();
        assert!(matches!(err, FleetError::VehicleNotFound(_)));
        assert_eq!(driver.state(), MotionState::Idle);
    }

    #[test]
    fn test_single_key_frame_distance() {
        // 2000 km/h for one 60 Hz frame
        let expected = 2000.0 / 3600.0 * FRAME_DT;
        assert!((frame_distance(Directions::UP) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_matches_single_axis() {
        let single = frame_distance(Directions::UP);
        let diagonal = frame_distance(Directions::UP | Directions::LEFT);
        assert!((single - diagonal).abs() / single < 1e-6);
    }

    #[test]
    fn test_no_input_is_noop() {
        let start = GeoPosition::new(45.0, 7.0);
        let mut fleet = fleet_at(start);
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        let report = run_frame(&mut driver, &mut fleet, &mut renderer, None);

        assert!(report.is_idle());
        assert_eq!(driver.frames(), 1);
        assert_eq!(fleet.position(&VehicleId::from("v1")), Some(start));
        assert!(renderer.events().is_empty());
    }

    #[test]
    fn test_moved_frame_requests_redraw() {
        let mut fleet = fleet_at(GeoPosition::new(45.0, 7.0));
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        driver.key_down(Directions::RIGHT);
        let report = run_frame(&mut driver, &mut fleet, &mut renderer, None);

        assert_eq!(report.moved, vec![VehicleId::from("v1")]);
        assert_eq!(renderer.events(), vec![RenderEvent::Redraw]);
    }

    #[test]
    fn test_key_release_stops_motion() {
        let mut fleet = fleet_at(GeoPosition::new(0.0, 0.0));
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        driver.key_down(Directions::UP);
        driver.key_down(Directions::RIGHT);
        driver.key_up(Directions::UP);
        assert_eq!(driver.input().held_keys, Directions::RIGHT);

        driver.key_up(Directions::RIGHT);
        let report = run_frame(&mut driver, &mut fleet, &mut renderer, None);
        assert!(report.is_idle());
    }

    #[test]
    fn test_device_input_merges_with_events() {
        let start = GeoPosition::new(0.0, 0.0);
        let mut fleet = fleet_at(start);
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        let device = InputSnapshot {
            pad: Directions::UP,
            ..Default::default()
        };
        run_frame(&mut driver, &mut fleet, &mut renderer, Some(device));

        let position = fleet.position(&VehicleId::from("v1")).unwrap();
        assert!(position.latitude > start.latitude);
        assert_eq!(position.longitude, start.longitude);
    }

    #[test]
    fn test_keys_ignored_before_enter() {
        let mut driver = ManualDriver::new(VehicleId::from("v1"), ManualStepConfig::default());
        driver.key_down(Directions::UP);
        driver.set_pad(Directions::LEFT);
        assert!(driver.input().is_neutral());
    }

    #[test]
    fn test_exit_clears_input_and_keeps_position() {
        let mut fleet = fleet_at(GeoPosition::new(0.0, 0.0));
        let mut driver = active_driver(&mut fleet);
        let mut renderer = RecordingRenderer::new();

        driver.key_down(Directions::UP);
        run_frame(&mut driver, &mut fleet, &mut renderer, None);
        let moved_to = fleet.position(&VehicleId::from("v1")).unwrap();

        let sink = PositionSink::disabled();
        driver.exit(
            &mut fleet,
            &mut DriveContext {
                renderer: &mut renderer,
                sink: &sink,
                suspended: None,
                device_input: None,
            },
        );

        assert!(driver.input().is_neutral());
        assert_eq!(fleet.position(&VehicleId::from("v1")), Some(moved_to));
        let report = run_frame(&mut driver, &mut fleet, &mut renderer, None);
        assert!(report.is_idle());
    }
}
