//! Manual input state and per-frame displacement
//!
//! Converts one frame of operator input into a latitude/longitude delta.
//!
//! ## Input sources
//!
//! - Held direction keys: one signed axis each
//! - Analog stick: x → east/west, y → north/south (screen y is inverted),
//!   each axis ignored inside the dead zone
//! - D-pad buttons: a full step each
//!
//! All sources add up. When a vertical and a horizontal key are held
//! together the key contribution is scaled by 1/√2 so diagonal key travel
//! matches axis-aligned travel; analog and pad contributions are not scaled.
//!
//! ## Step size
//!
//! The linear step (`speed × dt`) becomes a latitude step by small-angle
//! conversion. The longitude step divides by cos(latitude) for meridian
//! convergence, with cos(latitude) floored at `min_cos_latitude` so the step
//! stays bounded near the poles.

use bitflags::bitflags;
use libm::{cos, fabs};

use crate::geo::{clamp_latitude, km_to_latitude_deg, wrap_longitude, GeoPosition};

bitflags! {
    /// Set of pressed directions (keys or d-pad)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Directions: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl Directions {
    /// True if a vertical and a horizontal direction are both set
    pub fn is_diagonal(&self) -> bool {
        self.intersects(Directions::UP | Directions::DOWN)
            && self.intersects(Directions::LEFT | Directions::RIGHT)
    }

    /// Signed (north, east) unit contributions
    fn axes(&self) -> (f64, f64) {
        let mut north = 0.0;
        let mut east = 0.0;
        if self.contains(Directions::UP) {
            north += 1.0;
        }
        if self.contains(Directions::DOWN) {
            north -= 1.0;
        }
        if self.contains(Directions::LEFT) {
            east -= 1.0;
        }
        if self.contains(Directions::RIGHT) {
            east += 1.0;
        }
        (north, east)
    }
}

/// Analog stick sample, both axes in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogAxes {
    /// Horizontal axis (+1 = right)
    pub x: f64,
    /// Vertical axis (+1 = down, gamepad convention)
    pub y: f64,
}

impl AnalogAxes {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp to [-1, 1]; non-finite axes read as centered
    pub fn clamped(&self) -> Self {
        let axis = |v: f64| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            x: axis(self.x),
            y: axis(self.y),
        }
    }
}

/// One frame of operator input
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    /// Direction keys currently held
    pub held_keys: Directions,
    /// Last analog stick sample
    pub analog: AnalogAxes,
    /// D-pad buttons currently pressed
    pub pad: Directions,
}

impl InputSnapshot {
    /// True if nothing would move the vehicle (ignoring the dead zone)
    pub fn is_neutral(&self) -> bool {
        self.held_keys.is_empty() && self.pad.is_empty() && self.analog == AnalogAxes::default()
    }
}

/// Manual stepping configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualStepConfig {
    /// Nominal manual speed (km/h)
    pub speed_kmh: f64,
    /// Analog axis magnitude at or below which input is ignored
    pub dead_zone: f64,
    /// Analog gain
    pub joystick_sensitivity: f64,
    /// Floor for cos(latitude) in the longitude correction
    pub min_cos_latitude: f64,
}

impl Default for ManualStepConfig {
    fn default() -> Self {
        Self {
            speed_kmh: 2000.0,
            dead_zone: 0.01,
            joystick_sensitivity: 1.0,
            min_cos_latitude: 0.01,
        }
    }
}

/// Latitude/longitude change in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Displacement {
    pub d_lat: f64,
    pub d_lon: f64,
}

impl Displacement {
    pub fn is_zero(&self) -> bool {
        self.d_lat == 0.0 && self.d_lon == 0.0
    }
}

/// Degree step sizes for a linear step at `latitude`
///
/// # Returns
///
/// Tuple of (latitude step, longitude step) in degrees
pub fn step_degrees(latitude: f64, step_km: f64, min_cos_latitude: f64) -> (f64, f64) {
    let lat_step = km_to_latitude_deg(step_km);
    let cos_lat = fabs(cos(latitude.to_radians())).max(min_cos_latitude);
    (lat_step, lat_step / cos_lat)
}

/// Displacement produced by `input` during a frame of `dt_s` seconds
pub fn manual_displacement(
    latitude: f64,
    input: &InputSnapshot,
    dt_s: f64,
    config: &ManualStepConfig,
) -> Displacement {
    if !dt_s.is_finite() || dt_s <= 0.0 {
        return Displacement::default();
    }

    let step_km = config.speed_kmh / 3600.0 * dt_s;
    let (lat_step, lon_step) = step_degrees(latitude, step_km, config.min_cos_latitude);

    let (key_north, key_east) = input.held_keys.axes();
    let key_scale = if input.held_keys.is_diagonal() {
        core::f64::consts::FRAC_1_SQRT_2
    } else {
        1.0
    };
    let mut d_lat = key_north * lat_step * key_scale;
    let mut d_lon = key_east * lon_step * key_scale;

    let analog = input.analog.clamped();
    if fabs(analog.x) > config.dead_zone {
        d_lon += analog.x * lon_step * config.joystick_sensitivity;
    }
    if fabs(analog.y) > config.dead_zone {
        d_lat -= analog.y * lat_step * config.joystick_sensitivity;
    }

    let (pad_north, pad_east) = input.pad.axes();
    d_lat += pad_north * lat_step;
    d_lon += pad_east * lon_step;

    Displacement { d_lat, d_lon }
}

/// Apply a displacement, keeping the result on the globe
pub fn apply_displacement(position: &GeoPosition, displacement: &Displacement) -> GeoPosition {
    GeoPosition {
        latitude: clamp_latitude(position.latitude + displacement.d_lat),
        longitude: wrap_longitude(position.longitude + displacement.d_lon),
        altitude: position.altitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance_km;

    const FRAME_S: f64 = 1.0 / 60.0;

    fn keys(d: Directions) -> InputSnapshot {
        InputSnapshot {
            held_keys: d,
            ..Default::default()
        }
    }

    fn moved_km(start: GeoPosition, input: &InputSnapshot) -> f64 {
        let config = ManualStepConfig::default();
        let d = manual_displacement(start.latitude, input, FRAME_S, &config);
        distance_km(&start, &apply_displacement(&start, &d))
    }

    #[test]
    fn test_neutral_input_does_not_move() {
        let d = manual_displacement(10.0, &InputSnapshot::default(), FRAME_S, &Default::default());
        assert!(d.is_zero());
    }

    #[test]
    fn test_single_key_step_matches_speed() {
        // 2000 km/h for 1/60 s
        let expected = 2000.0 / 3600.0 / 60.0;
        let start = GeoPosition::new(0.0, 0.0);
        assert!((moved_km(start, &keys(Directions::UP)) - expected).abs() < 1e-6);
        assert!((moved_km(start, &keys(Directions::RIGHT)) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_diagonal_keys_match_axis_speed() {
        let start = GeoPosition::new(0.0, 0.0);
        let axis = moved_km(start, &keys(Directions::UP));
        let diagonal = moved_km(start, &keys(Directions::UP | Directions::LEFT));
        assert!((axis - diagonal).abs() < 1e-6);

        let start = GeoPosition::new(48.0, 11.0);
        let axis = moved_km(start, &keys(Directions::DOWN));
        let diagonal = moved_km(start, &keys(Directions::DOWN | Directions::RIGHT));
        assert!((axis - diagonal).abs() / axis < 1e-3);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let d = manual_displacement(
            0.0,
            &keys(Directions::UP | Directions::DOWN),
            FRAME_S,
            &Default::default(),
        );
        assert!(d.is_zero());
    }

    #[test]
    fn test_analog_dead_zone_ignored() {
        let input = InputSnapshot {
            analog: AnalogAxes::new(0.005, -0.01),
            ..Default::default()
        };
        let d = manual_displacement(0.0, &input, FRAME_S, &Default::default());
        assert!(d.is_zero());
    }

    #[test]
    fn test_analog_y_is_inverted() {
        let input = InputSnapshot {
            analog: AnalogAxes::new(0.0, -1.0),
            ..Default::default()
        };
        let d = manual_displacement(0.0, &input, FRAME_S, &Default::default());
        assert!(d.d_lat > 0.0);
        assert_eq!(d.d_lon, 0.0);
    }

    #[test]
    fn test_analog_and_pad_not_diagonal_corrected() {
        let config = ManualStepConfig::default();
        let (lat_step, lon_step) = step_degrees(0.0, 2000.0 / 3600.0 * FRAME_S, config.min_cos_latitude);
        let input = InputSnapshot {
            held_keys: Directions::UP | Directions::RIGHT,
            pad: Directions::UP,
            analog: AnalogAxes::new(1.0, 0.0),
        };
        let d = manual_displacement(0.0, &input, FRAME_S, &config);
        let k = core::f64::consts::FRAC_1_SQRT_2;
        assert!((d.d_lat - (lat_step * k + lat_step)).abs() < 1e-12);
        assert!((d.d_lon - (lon_step * k + lon_step)).abs() < 1e-12);
    }

    #[test]
    fn test_longitude_step_bounded_near_pole() {
        let config = ManualStepConfig::default();
        let (lat_step, lon_step) = step_degrees(90.0, 1.0, config.min_cos_latitude);
        assert!(lon_step.is_finite());
        assert!((lon_step / lat_step - 1.0 / config.min_cos_latitude).abs() < 1e-9);
    }

    #[test]
    fn test_apply_displacement_stays_on_globe() {
        let start = GeoPosition::new(89.99, 179.99);
        let next = apply_displacement(
            &start,
            &Displacement {
                d_lat: 0.5,
                d_lon: 0.5,
            },
        );
        assert_eq!(next.latitude, 90.0);
        assert!(next.longitude < -179.0);
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let input = keys(Directions::UP);
        assert!(manual_displacement(0.0, &input, 0.0, &Default::default()).is_zero());
        assert!(manual_displacement(0.0, &input, f64::NAN, &Default::default()).is_zero());
    }
}
