use globe_fleet_core::vehicle::VehicleId;

/// Errors surfaced by the control API and the persistence collaborators.
///
/// Tick and frame processing never returns these; missing entities are
/// skipped and persistence failures are logged by the position sink.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    #[error("Waypoint not found: {0}")]
    WaypointNotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("No tokio runtime available to run {0}")]
    RuntimeUnavailable(&'static str),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
