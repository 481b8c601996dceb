//! Geographic math utilities
//!
//! This module handles:
//! - Coordinate validation (the gate every hypothesis passes through)
//! - Great-circle distance and bearing
//! - Center point and padded bounding boxes for clusters
//! - Decimal and degrees-minutes-seconds formatting
//!
//! Everything here is pure and deterministic.

pub mod bounds;
pub mod distance;
pub mod dms;

pub use bounds::{bounding_box, center_point, BoundingBox};
pub use distance::{bearing, distance_km};
pub use dms::{extract_coordinates_from_text, format_decimal, format_dms, CoordinateFormat};

use crate::constants::geo::DEDUP_DECIMAL_PLACES;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A geographic coordinate (latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create new coordinates
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validate that coordinates are numeric and within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(Error::InvalidCoordinates(
                "Coordinates must be valid numbers".to_string(),
            ));
        }
        if self.lat < -90.0 || self.lat > 90.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if self.lng < -180.0 || self.lng > 180.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// Check validity without producing a reason
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Key used to collapse near-identical coordinates
    ///
    /// Both axes are rounded to 4 decimal places (~11 m) and scaled to integers
    /// so the key can be hashed.
    pub fn dedup_key(&self) -> (i64, i64) {
        let scale = 10f64.powi(DEDUP_DECIMAL_PLACES);
        (
            (self.lat * scale).round() as i64,
            (self.lng * scale).round() as i64,
        )
    }
}

/// Build validated coordinates from raw latitude/longitude values
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<Coordinates> {
    let coords = Coordinates::new(lat, lng);
    coords.validate()?;
    Ok(coords)
}
