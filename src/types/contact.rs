//! Contact types (records owned by the CRM sync pipeline)

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::defaults::DEFAULT_CORRIDOR_RADIUS_KM;

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build coordinates from nullable columns, rejecting missing,
    /// non-finite or out-of-range values.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        let (lat, lng) = (lat?, lng?);
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// Anything with a position on the map
pub trait Located {
    fn coordinates(&self) -> Coordinates;
}

impl Located for Coordinates {
    fn coordinates(&self) -> Coordinates {
        *self
    }
}

/// A geocoded contact, as offered to the corridor planner
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactLocation {
    pub id: Uuid,
    pub display_name: String,
    pub account_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Located for ContactLocation {
    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Request for contacts along a drawn line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorRequest {
    pub start: Coordinates,
    pub end: Coordinates,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_radius_km() -> f64 {
    DEFAULT_CORRIDOR_RADIUS_KM
}

/// Contacts in travel order from start toward end
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorResponse {
    pub contacts: Vec<ContactLocation>,
}
