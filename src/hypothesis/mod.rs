//! Location hypotheses and the request/result types around them
//!
//! A [`LocationHypothesis`] is one candidate answer to "where was this photo
//! taken?". Hypotheses are created from provider candidates, re-weighted and
//! ranked by the aggregator, and returned inside an [`AggregationResult`].

pub mod request;
pub mod result;

pub use request::{AggregationRequest, Capability, ProcessingMode};
pub use result::{AggregationResult, ImageMetadata, ProcessingMetadata};

use crate::coord::{validate_coordinates, Coordinates};
use crate::error::{Error, Result};
use crate::provider::AddressDetails;
use serde::{Deserialize, Serialize};

/// Where a hypothesis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// GPS coordinates embedded in the image
    ExifGps,
    /// AI landmark recognition
    LandmarkDetection,
    /// Text found in the image, geocoded
    OcrGeocoding,
    /// Reverse geocoding lookup
    ReverseGeocoding,
}

impl DataSource {
    /// Fixed reliability multiplier applied during ranking
    ///
    /// EXIF GPS is ground truth when present; OCR geocoding suffers from
    /// ambiguous place-name matches.
    pub fn reliability_weight(self) -> f64 {
        match self {
            Self::ExifGps => 1.0,
            Self::LandmarkDetection => 0.9,
            Self::ReverseGeocoding => 0.8,
            Self::OcrGeocoding => 0.7,
        }
    }

    /// Tie-break rank (lower sorts first)
    pub fn priority(self) -> u8 {
        match self {
            Self::ExifGps => 0,
            Self::LandmarkDetection => 1,
            Self::ReverseGeocoding => 2,
            Self::OcrGeocoding => 3,
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::ExifGps => "EXIF GPS",
            Self::LandmarkDetection => "Landmark Detection",
            Self::OcrGeocoding => "OCR + Geocoding",
            Self::ReverseGeocoding => "Reverse Geocoding",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExifGps => write!(f, "exif_gps"),
            Self::LandmarkDetection => write!(f, "landmark_detection"),
            Self::OcrGeocoding => write!(f, "ocr_geocoding"),
            Self::ReverseGeocoding => write!(f, "reverse_geocoding"),
        }
    }
}

/// A single candidate location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHypothesis {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub source: DataSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl LocationHypothesis {
    /// Create a hypothesis, validating the coordinates
    ///
    /// The confidence is clamped into [0, 1]; a non-finite confidence is
    /// rejected along with out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64, confidence: f64, source: DataSource) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        if !confidence.is_finite() {
            return Err(Error::InvalidHypothesis(format!(
                "Confidence {} is not a number",
                confidence
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            description: None,
            address: None,
            landmark_name: None,
            country: None,
            country_code: None,
            admin_area: None,
            locality: None,
            postal_code: None,
        })
    }

    /// Set the free-text description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the landmark name
    pub fn with_landmark(mut self, name: impl Into<String>) -> Self {
        self.landmark_name = Some(name.into());
        self
    }

    /// Attach address details
    pub fn with_address(mut self, details: &AddressDetails) -> Self {
        self.apply_address(details);
        self
    }

    /// Copy address fields onto this hypothesis
    pub fn apply_address(&mut self, details: &AddressDetails) {
        self.address = details.formatted_address.clone();
        self.country = details.country.clone();
        self.country_code = details.country_code.clone();
        self.admin_area = details.admin_area.clone();
        self.locality = details.locality.clone();
        if details.postal_code.is_some() {
            self.postal_code = details.postal_code.clone();
        }
    }

    /// Position of this hypothesis
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Short display name: landmark, then address, then description
    pub fn display_name(&self) -> Option<&str> {
        self.landmark_name
            .as_deref()
            .or(self.address.as_deref())
            .or(self.description.as_deref())
    }
}
