//! Great-circle distance and bearing

use crate::constants::geo::EARTH_RADIUS_KM;
use crate::coord::Coordinates;
use std::f64::consts::PI;
use tracing::debug;

/// Calculate the distance between two points in kilometers (Haversine formula)
///
/// # Returns
/// Distance in kilometers, or `f64::INFINITY` if either point is invalid.
/// An invalid point therefore never counts as "nearby".
pub fn distance_km(p1: Coordinates, p2: Coordinates) -> f64 {
    if !p1.is_valid() || !p2.is_valid() {
        debug!(?p1, ?p2, "distance requested for invalid coordinates");
        return f64::INFINITY;
    }

    let lat1 = p1.lat * PI / 180.0;
    let lat2 = p2.lat * PI / 180.0;
    let delta_lat = (p2.lat - p1.lat) * PI / 180.0;
    let delta_lng = (p2.lng - p1.lng) * PI / 180.0;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial bearing from `p1` to `p2` in degrees, normalised to [0, 360)
///
/// Returns 0.0 for invalid input.
pub fn bearing(p1: Coordinates, p2: Coordinates) -> f64 {
    if !p1.is_valid() || !p2.is_valid() {
        return 0.0;
    }

    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let delta_lng = (p2.lng - p1.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
