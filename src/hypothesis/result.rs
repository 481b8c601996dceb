//! Aggregation results and their metadata

use super::LocationHypothesis;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Facts about the input image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub filename: String,
    pub size_bytes: usize,
    pub width: u32,
    pub height: u32,
    /// Decoded container format (e.g. "jpeg")
    pub format: String,
    pub has_exif: bool,
    pub has_gps: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_taken: Option<NaiveDateTime>,
}

impl ImageMetadata {
    /// EXIF GPS position, if both components were present
    pub fn gps(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// What happened during one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub processing_time_ms: u64,
    pub apis_used: Vec<String>,
    pub landmark_results_count: usize,
    pub text_results_count: usize,
    pub geocoding_queries_count: usize,
    pub object_results_count: usize,
    /// Detected object labels that name location-bearing structures
    #[serde(default)]
    pub location_objects: Vec<String>,
    /// Candidates dropped because their coordinates were invalid
    #[serde(default)]
    pub discarded_candidates: usize,
    /// Provider failures, one entry per failed call
    #[serde(default)]
    pub error_messages: Vec<String>,
}

/// Final output of an aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub success: bool,
    pub request_id: Uuid,
    /// Ranked hypotheses, best first
    pub hypotheses: Vec<LocationHypothesis>,
    pub best_guess: Option<LocationHypothesis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_metadata: Option<ImageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_metadata: Option<ProcessingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl AggregationResult {
    /// Successful result; the best guess is the first hypothesis
    pub fn succeeded(request_id: Uuid, hypotheses: Vec<LocationHypothesis>) -> Self {
        Self {
            success: true,
            request_id,
            best_guess: hypotheses.first().cloned(),
            hypotheses,
            image_metadata: None,
            processing_metadata: None,
            error_message: None,
            processed_at: Utc::now(),
        }
    }

    /// Failed result with no hypotheses
    pub fn failed(request_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id,
            hypotheses: Vec::new(),
            best_guess: None,
            image_metadata: None,
            processing_metadata: None,
            error_message: Some(message.into()),
            processed_at: Utc::now(),
        }
    }

    /// Keep at most `max` hypotheses, re-deriving the best guess
    pub fn truncated(mut self, max: usize) -> Self {
        self.hypotheses.truncate(max);
        self.best_guess = self.hypotheses.first().cloned();
        self
    }
}
