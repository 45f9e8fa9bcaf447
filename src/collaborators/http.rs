//! REST position store
//!
//! Persists positions with `PUT {base}/api/vehicles/{id}` and a JSON body
//! `{ "id", "latitude", "longitude" }`. Any non-2xx status is reported as
//! `FleetError::Persistence`.

use async_trait::async_trait;
use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::vehicle::VehicleId;
use serde::Serialize;

use super::PositionStore;
use crate::error::{FleetError, Result};

const USER_AGENT: &str = concat!("globe_fleet/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct VehiclePositionBody<'a> {
    id: &'a str,
    latitude: f64,
    longitude: f64,
}

/// Position store backed by the fleet REST API
#[derive(Debug, Clone)]
pub struct HttpPositionStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPositionStore {
    /// Create a store for the API rooted at `base_url` (e.g. `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing client (clones share its connection pool)
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn vehicle_url(&self, vehicle_id: &VehicleId) -> String {
        format!(
            "{}/api/vehicles/{}",
            self.base_url,
            urlencoding::encode(vehicle_id.as_str())
        )
    }
}

#[async_trait]
impl PositionStore for HttpPositionStore {
    async fn update_vehicle_position(
        &self,
        vehicle_id: &VehicleId,
        position: GeoPosition,
    ) -> Result<()> {
        let url = self.vehicle_url(vehicle_id);
        let body = VehiclePositionBody {
            id: vehicle_id.as_str(),
            latitude: position.latitude,
            longitude: position.longitude,
        };

        let response = self.client.put(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(FleetError::Persistence(format!(
                "PUT {url} returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
