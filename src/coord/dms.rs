//! Coordinate formatting and parsing
//!
//! Two textual forms are supported: decimal degrees (`48.858400, 2.294500`)
//! and degrees-minutes-seconds (`48°51'30.24"N, 2°17'40.20"E`).
//!
//! DMS is lossy: seconds are kept to two decimal places, so a decimal value
//! converted to DMS and back may differ by up to ~3e-6 degrees (~30 cm).

use crate::coord::{validate_coordinates, Coordinates};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static DECIMAL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d{1,3}\.\d+),\s*(-?\d{1,3}\.\d+)").expect("valid decimal pair regex")
});

static DMS_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d{1,3})°\s*(\d{1,2})'\s*(\d{1,2}(?:\.\d+)?)"\s*([NSEWnsew])"#)
        .expect("valid dms regex")
});

/// Output form for coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateFormat {
    #[default]
    Decimal,
    Dms,
}

impl CoordinateFormat {
    /// Render coordinates in this form
    pub fn format(self, coords: Coordinates) -> String {
        match self {
            Self::Decimal => format_decimal(coords),
            Self::Dms => format_dms(coords),
        }
    }

    /// Parse coordinates written in this form
    pub fn parse(self, s: &str) -> Result<Coordinates> {
        match self {
            Self::Decimal => parse_decimal(s),
            Self::Dms => parse_dms(s),
        }
    }
}

impl std::str::FromStr for CoordinateFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "decimal" | "dd" => Ok(Self::Decimal),
            "dms" => Ok(Self::Dms),
            _ => Err(format!("Unknown coordinate format: {}", s)),
        }
    }
}

/// Which axis a DMS value belongs to (decides the hemisphere letter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// A single angle in degrees, minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    /// Rounded to two decimal places
    pub seconds: f64,
    pub hemisphere: char,
}

impl std::fmt::Display for Dms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}°{}'{:.2}\"{}",
            self.degrees, self.minutes, self.seconds, self.hemisphere
        )
    }
}

/// Convert a decimal angle into degrees, minutes and seconds
pub fn to_dms(decimal: f64, axis: Axis) -> Dms {
    let hemisphere = match (axis, decimal >= 0.0) {
        (Axis::Latitude, true) => 'N',
        (Axis::Latitude, false) => 'S',
        (Axis::Longitude, true) => 'E',
        (Axis::Longitude, false) => 'W',
    };

    let abs = decimal.abs();
    let mut degrees = abs.trunc() as u32;
    let minutes_float = (abs - abs.trunc()) * 60.0;
    let mut minutes = minutes_float.trunc() as u32;
    let mut seconds = (((minutes_float - minutes_float.trunc()) * 60.0) * 100.0).round() / 100.0;

    // Rounding can carry 59.995" up to a full minute
    if seconds >= 60.0 {
        seconds = 0.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes = 0;
        degrees += 1;
    }

    Dms {
        degrees,
        minutes,
        seconds,
        hemisphere,
    }
}

/// Convert degrees, minutes and seconds back to a signed decimal angle
///
/// `S` and `W` (either case) produce negative values.
pub fn dms_to_decimal(degrees: u32, minutes: u32, seconds: f64, direction: char) -> f64 {
    let decimal = degrees as f64 + minutes as f64 / 60.0 + seconds / 3600.0;
    match direction.to_ascii_uppercase() {
        'S' | 'W' => -decimal,
        _ => decimal,
    }
}

/// Format coordinates as decimal degrees with 6 decimal places
pub fn format_decimal(coords: Coordinates) -> String {
    format!("{:.6}, {:.6}", coords.lat, coords.lng)
}

/// Format coordinates as degrees-minutes-seconds
pub fn format_dms(coords: Coordinates) -> String {
    format!(
        "{}, {}",
        to_dms(coords.lat, Axis::Latitude),
        to_dms(coords.lng, Axis::Longitude)
    )
}

/// Parse a `lat, lng` decimal pair
pub fn parse_decimal(s: &str) -> Result<Coordinates> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| Error::InvalidCoordinates(format!("Expected 'lat, lng', got: {}", s)))?;

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCoordinates(format!("Invalid latitude: {}", lat.trim())))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCoordinates(format!("Invalid longitude: {}", lng.trim())))?;

    validate_coordinates(lat, lng)
}

/// Parse a DMS pair as produced by [`format_dms`]
pub fn parse_dms(s: &str) -> Result<Coordinates> {
    let parts: Vec<f64> = DMS_PART
        .captures_iter(s)
        .filter_map(|caps| {
            let degrees = caps[1].parse().ok()?;
            let minutes = caps[2].parse().ok()?;
            let seconds = caps[3].parse().ok()?;
            let direction = caps[4].chars().next()?;
            Some(dms_to_decimal(degrees, minutes, seconds, direction))
        })
        .collect();

    match parts.as_slice() {
        [lat, lng] => validate_coordinates(*lat, *lng),
        _ => Err(Error::InvalidCoordinates(format!(
            "Expected two DMS values, got: {}",
            s
        ))),
    }
}

/// Find decimal `lat, lng` pairs embedded in free text
///
/// Pairs outside the valid coordinate range are skipped.
pub fn extract_coordinates_from_text(text: &str) -> Vec<Coordinates> {
    DECIMAL_PAIR
        .captures_iter(text)
        .filter_map(|caps| {
            let lat: f64 = caps[1].parse().ok()?;
            let lng: f64 = caps[2].parse().ok()?;
            validate_coordinates(lat, lng).ok()
        })
        .collect()
}
