//! Geographic coordinate resolution.

mod locator;
mod reference;
mod resolver;

pub use locator::{DeviceLocator, Fix, FixedLocator, LocateRequest, NoLocator};
pub use reference::{nearest_reference, ReferencePoint, REFERENCE_POINTS};
pub use resolver::{GeoResolver, LocationSource, Resolution};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing coordinates for equality.
const COORDINATE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        (self.latitude - other.latitude).abs() < COORDINATE_EPSILON
            && (self.longitude - other.longitude).abs() < COORDINATE_EPSILON
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
