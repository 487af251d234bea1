use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    // Zero is never a real coordinate in the service area; it is what an unset field decodes to.
    pub fn has_zero_coordinate(&self) -> bool {
        self.lat == 0.0 || self.lon == 0.0
    }
}

/// Route record backing exactly one delivery. Written once, together with the
/// delivery row, and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geo {
    pub id: Uuid,
    pub origin: GeoPoint,
    pub origin_address: String,
    pub destination: GeoPoint,
    pub destination_address: String,
    pub distance_meters: f64,
}
