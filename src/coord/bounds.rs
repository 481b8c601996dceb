//! Aggregate geometry over groups of coordinates

use crate::constants::geo::KM_PER_DEGREE_LAT;
use crate::coord::Coordinates;
use serde::{Deserialize, Serialize};

/// A latitude/longitude aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Check whether a point lies inside the box (edges included)
    pub fn contains(&self, point: Coordinates) -> bool {
        point.lat <= self.north
            && point.lat >= self.south
            && point.lng <= self.east
            && point.lng >= self.west
    }
}

/// Arithmetic mean of a set of coordinates
///
/// Returns `None` for an empty slice. Adequate for clusters a few hundred
/// kilometers wide; it does not handle the antimeridian.
pub fn center_point(points: &[Coordinates]) -> Option<Coordinates> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let n = points.len() as f64;
            let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
            let lng = points.iter().map(|p| p.lng).sum::<f64>() / n;
            Some(Coordinates::new(lat, lng))
        }
    }
}

/// Bounding box around a set of coordinates, padded on every side
///
/// # Arguments
/// * `points` - Points to enclose
/// * `padding_km` - Padding added beyond the outermost points
pub fn bounding_box(points: &[Coordinates], padding_km: f64) -> Option<BoundingBox> {
    let first = points.first()?;

    let (mut min_lat, mut max_lat) = (first.lat, first.lat);
    let (mut min_lng, mut max_lng) = (first.lng, first.lng);
    for p in &points[1..] {
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
        min_lng = min_lng.min(p.lng);
        max_lng = max_lng.max(p.lng);
    }

    let lat_padding = padding_km / KM_PER_DEGREE_LAT;
    let north = (max_lat + lat_padding).min(90.0);
    let south = (min_lat - lat_padding).max(-90.0);

    // A box reaching a pole spans every meridian
    let mid_lat = ((min_lat + max_lat) / 2.0).to_radians();
    let cos = mid_lat.cos();
    if north >= 90.0 || south <= -90.0 || cos <= f64::EPSILON {
        return Some(BoundingBox {
            north,
            south,
            east: 180.0,
            west: -180.0,
        });
    }

    let lng_padding = padding_km / (KM_PER_DEGREE_LAT * cos);
    Some(BoundingBox {
        north,
        south,
        east: (max_lng + lng_padding).min(180.0),
        west: (min_lng - lng_padding).max(-180.0),
    })
}
