//! globe_fleet - Fleet motion simulator for a 3D globe
//!
//! This library moves vehicles across the globe either autonomously along
//! assigned waypoints or under operator control, and keeps a renderer and a
//! position store informed. The pure math lives in `globe_fleet_core`; this
//! crate adds the tokio loops, collaborator interfaces and configuration.

// Runtime infrastructure (logging, clock)
pub mod core;

// Error type shared by the control API and collaborators
pub mod error;

// Motion configuration
pub mod parameters;

// Renderer, persistence, input and entity interfaces
pub mod collaborators;

// Local working set
pub mod fleet;

// Asynchronous position persistence
pub mod sink;

// Autonomous and manual drivers
pub mod driver;

// Single write authority and motion loops
pub mod arbiter;

#[doc(hidden)]
pub use tracing as __tracing;

pub use arbiter::{ControlChange, MotionArbiter, Simulation};
pub use collaborators::{
    EntitySource, InputSource, PathStyle, PositionStore, SceneRenderer, WorkingSet,
};
pub use error::{FleetError, Result};
pub use fleet::Fleet;
pub use parameters::MotionParams;
pub use sink::PositionSink;

pub use globe_fleet_core::control::{AnalogAxes, Directions, InputSnapshot};
pub use globe_fleet_core::geo::GeoPosition;
pub use globe_fleet_core::mission::{Waypoint, WaypointId};
pub use globe_fleet_core::vehicle::{Vehicle, VehicleId};
