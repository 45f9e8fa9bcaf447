//! Motion Parameter Definitions
//!
//! # Parameters
//!
//! - `tick_interval_ms` - Autonomous tick period (default 100 ms)
//! - `autonomous_speed_kmh` - Fleet speed while following waypoints (default 200)
//! - `manual_speed_kmh` - Speed of a manually steered vehicle (default 2000)
//! - `frame_rate_hz` - Nominal manual frame rate (default 60)
//! - `max_frame_dt_s` - Longest frame the manual driver integrates (default 0.25 s)
//! - `dead_zone` - Analog axis magnitude ignored as drift (default 0.01)
//! - `joystick_sensitivity` - Analog gain (default 1.0)
//! - `min_cos_latitude` - Floor for cos(latitude) in the longitude step (default 0.01)

use std::time::Duration;

use globe_fleet_core::control::ManualStepConfig;
use serde::Deserialize;

use crate::error::{FleetError, Result};

// --- Defaults ---

const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
const DEFAULT_AUTONOMOUS_SPEED_KMH: f64 = 200.0;
const DEFAULT_MANUAL_SPEED_KMH: f64 = 2000.0;
const DEFAULT_FRAME_RATE_HZ: f64 = 60.0;
const DEFAULT_MAX_FRAME_DT_S: f64 = 0.25;
const DEFAULT_DEAD_ZONE: f64 = 0.01;
const DEFAULT_JOYSTICK_SENSITIVITY: f64 = 1.0;
const DEFAULT_MIN_COS_LATITUDE: f64 = 0.01;

// --- Ranges ---

const MIN_TICK_INTERVAL_MS: u64 = 10;
const MAX_TICK_INTERVAL_MS: u64 = 10_000;

const MIN_SPEED_KMH: f64 = 0.0;
const MAX_SPEED_KMH: f64 = 100_000.0;

const MIN_FRAME_RATE_HZ: f64 = 1.0;
const MAX_FRAME_RATE_HZ: f64 = 500.0;

const MIN_MAX_FRAME_DT_S: f64 = 0.001;
const MAX_MAX_FRAME_DT_S: f64 = 5.0;

const MIN_DEAD_ZONE: f64 = 0.0;
const MAX_DEAD_ZONE: f64 = 0.9;

const MIN_SENSITIVITY: f64 = 0.0;
const MAX_SENSITIVITY: f64 = 10.0;

const MIN_COS_LATITUDE_FLOOR: f64 = 1e-4;
const MAX_COS_LATITUDE_FLOOR: f64 = 1.0;

/// Motion driver parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Autonomous tick period (milliseconds)
    pub tick_interval_ms: u64,
    /// Autonomous speed, identical for every vehicle (km/h)
    pub autonomous_speed_kmh: f64,
    /// Manual steering speed (km/h)
    pub manual_speed_kmh: f64,
    /// Nominal manual frame rate, also the rate of the frame loop (Hz)
    pub frame_rate_hz: f64,
    /// Upper bound on the measured frame time (seconds)
    pub max_frame_dt_s: f64,
    /// Analog dead zone (axis magnitude)
    pub dead_zone: f64,
    /// Analog gain
    pub joystick_sensitivity: f64,
    /// Floor for cos(latitude) in the longitude step
    pub min_cos_latitude: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            autonomous_speed_kmh: DEFAULT_AUTONOMOUS_SPEED_KMH,
            manual_speed_kmh: DEFAULT_MANUAL_SPEED_KMH,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            max_frame_dt_s: DEFAULT_MAX_FRAME_DT_S,
            dead_zone: DEFAULT_DEAD_ZONE,
            joystick_sensitivity: DEFAULT_JOYSTICK_SENSITIVITY,
            min_cos_latitude: DEFAULT_MIN_COS_LATITUDE,
        }
    }
}

impl MotionParams {
    /// Parse from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: MotionParams = serde_json::from_str(json)?;
        Ok(params.validated())
    }

    /// Read and parse a JSON parameter file
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FleetError::InvalidParams(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Clamp every field into its range
    ///
    /// Non-finite values fall back to the default; the frame-time cap is
    /// never allowed below one nominal frame.
    pub fn validated(mut self) -> Self {
        self.tick_interval_ms = self
            .tick_interval_ms
            .clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        self.autonomous_speed_kmh = clamp_or_default(
            self.autonomous_speed_kmh,
            MIN_SPEED_KMH,
            MAX_SPEED_KMH,
            DEFAULT_AUTONOMOUS_SPEED_KMH,
        );
        self.manual_speed_kmh = clamp_or_default(
            self.manual_speed_kmh,
            MIN_SPEED_KMH,
            MAX_SPEED_KMH,
            DEFAULT_MANUAL_SPEED_KMH,
        );
        self.frame_rate_hz = clamp_or_default(
            self.frame_rate_hz,
            MIN_FRAME_RATE_HZ,
            MAX_FRAME_RATE_HZ,
            DEFAULT_FRAME_RATE_HZ,
        );
        self.max_frame_dt_s = clamp_or_default(
            self.max_frame_dt_s,
            MIN_MAX_FRAME_DT_S,
            MAX_MAX_FRAME_DT_S,
            DEFAULT_MAX_FRAME_DT_S,
        )
        .max(self.nominal_frame_dt_s());
        self.dead_zone =
            clamp_or_default(self.dead_zone, MIN_DEAD_ZONE, MAX_DEAD_ZONE, DEFAULT_DEAD_ZONE);
        self.joystick_sensitivity = clamp_or_default(
            self.joystick_sensitivity,
            MIN_SENSITIVITY,
            MAX_SENSITIVITY,
            DEFAULT_JOYSTICK_SENSITIVITY,
        );
        self.min_cos_latitude = clamp_or_default(
            self.min_cos_latitude,
            MIN_COS_LATITUDE_FLOOR,
            MAX_COS_LATITUDE_FLOOR,
            DEFAULT_MIN_COS_LATITUDE,
        );
        self
    }

    /// Autonomous tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Distance covered by every vehicle in one autonomous tick (km)
    pub fn autonomous_step_km(&self) -> f64 {
        self.autonomous_speed_kmh / 3600.0 * (self.tick_interval_ms as f64 / 1000.0)
    }

    /// Nominal frame time (seconds)
    pub fn nominal_frame_dt_s(&self) -> f64 {
        1.0 / self.frame_rate_hz
    }

    /// Period of the manual frame loop
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(self.nominal_frame_dt_s())
    }

    /// Core stepping configuration for the manual driver
    pub fn manual_step_config(&self) -> ManualStepConfig {
        ManualStepConfig {
            speed_kmh: self.manual_speed_kmh,
            dead_zone: self.dead_zone,
            joystick_sensitivity: self.joystick_sensitivity,
            min_cos_latitude: self.min_cos_latitude,
        }
    }
}

fn clamp_or_default(value: f64, min: f64, max: f64, default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}
