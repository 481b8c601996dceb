//! Aggregation request and processing modes

use crate::config::defaults::{
    DEFAULT_INCLUDE_ADDRESS, DEFAULT_INCLUDE_METADATA, DEFAULT_MAX_RESULTS, DEFAULT_MIN_CONFIDENCE,
};
use crate::constants::ranking::MAX_RESULTS_LIMIT;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A class of signal the aggregator can collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// GPS coordinates from EXIF metadata
    ExifGps,
    /// Landmark detection
    Landmarks,
    /// OCR text detection followed by forward geocoding
    TextGeocoding,
    /// Object detection
    Objects,
}

/// Processing depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// EXIF and landmarks only
    Fast,
    /// Adds OCR + geocoding
    Standard,
    /// Adds object detection
    Comprehensive,
}

impl ProcessingMode {
    /// Signals enabled for this mode
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Fast => &[Capability::ExifGps, Capability::Landmarks],
            Self::Standard => &[
                Capability::ExifGps,
                Capability::Landmarks,
                Capability::TextGeocoding,
            ],
            Self::Comprehensive => &[
                Capability::ExifGps,
                Capability::Landmarks,
                Capability::TextGeocoding,
                Capability::Objects,
            ],
        }
    }

    /// Whether this mode collects the given signal
    pub fn enables(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Stable name used in fingerprints, config and URLs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl Default for ProcessingMode {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            _ => Err(format!("Unknown processing mode: {}", s)),
        }
    }
}

/// Configuration for one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    #[serde(default)]
    pub mode: ProcessingMode,

    /// Confidence floor (inclusive)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum number of hypotheses returned
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Attach image and processing metadata to the result
    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,

    /// Reverse geocode hypotheses that lack an address
    #[serde(default = "default_include_address")]
    pub include_address: bool,
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_include_metadata() -> bool {
    DEFAULT_INCLUDE_METADATA
}
fn default_include_address() -> bool {
    DEFAULT_INCLUDE_ADDRESS
}

impl Default for AggregationRequest {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            min_confidence: default_min_confidence(),
            max_results: default_max_results(),
            include_metadata: default_include_metadata(),
            include_address: default_include_address(),
        }
    }
}

impl AggregationRequest {
    /// Request with the given mode and defaults elsewhere
    pub fn with_mode(mode: ProcessingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Check parameter ranges
    ///
    /// `min_confidence` must lie in [0, 1] and `max_results` in [1, 20].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidRequest(format!(
                "min_confidence {} is out of range [0, 1]",
                self.min_confidence
            )));
        }
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(Error::InvalidRequest(format!(
                "max_results {} is out of range [1, {}]",
                self.max_results, MAX_RESULTS_LIMIT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        assert!(ProcessingMode::Fast.enables(Capability::ExifGps));
        assert!(ProcessingMode::Fast.enables(Capability::Landmarks));
        assert!(!ProcessingMode::Fast.enables(Capability::TextGeocoding));
        assert!(!ProcessingMode::Fast.enables(Capability::Objects));

        assert!(ProcessingMode::Standard.enables(Capability::TextGeocoding));
        assert!(!ProcessingMode::Standard.enables(Capability::Objects));

        assert_eq!(ProcessingMode::Comprehensive.capabilities().len(), 4);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("FAST".parse::<ProcessingMode>().unwrap(), ProcessingMode::Fast);
        assert_eq!(
            "comprehensive".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::Comprehensive
        );
        assert!("turbo".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&ProcessingMode::Standard).unwrap();
        assert_eq!(json, "\"standard\"");
    }

    #[test]
    fn test_default_request() {
        let req = AggregationRequest::default();
        assert_eq!(req.mode, ProcessingMode::Standard);
        assert_eq!(req.min_confidence, 0.6);
        assert_eq!(req.max_results, 5);
        assert!(req.include_address);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut req = AggregationRequest::default();
        req.min_confidence = 1.5;
        assert!(req.validate().is_err());

        let mut req = AggregationRequest::default();
        req.max_results = 0;
        assert!(req.validate().is_err());

        req.max_results = 21;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: AggregationRequest = serde_json::from_str(r#"{"mode": "fast"}"#).unwrap();
        assert_eq!(req.mode, ProcessingMode::Fast);
        assert_eq!(req.max_results, 5);
    }
}
