//! Stub providers shared by unit tests

use crate::error::{Error, Result};
use crate::hypothesis::ImageMetadata;
use crate::provider::{
    AddressDetails, DetectedObject, ForwardGeocoder, GeocodeCandidate, ImageInput, ImageInspector,
    LandmarkCandidate, LandmarkDetector, ObjectDetector, ProviderError, ReverseGeocoder,
    TextDetector,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Canned behaviour for a stub call
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(&'static str),
    /// Never answers within any sensible timeout
    Hang,
}

impl<T: Clone> Reply<T> {
    async fn respond(&self) -> std::result::Result<T, ProviderError> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Fail(msg) => Err(ProviderError::Request(msg.to_string())),
            Self::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Request("hung".to_string()))
            }
        }
    }
}

pub fn landmark(name: &str, score: f64, latitude: f64, longitude: f64) -> LandmarkCandidate {
    LandmarkCandidate {
        name: name.to_string(),
        score,
        latitude,
        longitude,
    }
}

pub fn geocode_match(latitude: f64, longitude: f64, confidence: f64, address: &str) -> GeocodeCandidate {
    GeocodeCandidate {
        latitude,
        longitude,
        confidence,
        address: AddressDetails {
            formatted_address: Some(address.to_string()),
            ..Default::default()
        },
    }
}

pub fn address(formatted: &str, locality: &str) -> AddressDetails {
    AddressDetails {
        formatted_address: Some(formatted.to_string()),
        country: Some("France".to_string()),
        country_code: Some("fr".to_string()),
        admin_area: Some("Île-de-France".to_string()),
        locality: Some(locality.to_string()),
        postal_code: None,
    }
}

/// Accepts any bytes except `b"corrupt"` and empty input
#[derive(Debug, Default)]
pub struct StubInspector {
    pub gps: Option<(f64, f64)>,
}

impl StubInspector {
    pub fn with_gps(lat: f64, lng: f64) -> Self {
        Self {
            gps: Some((lat, lng)),
        }
    }
}

impl ImageInspector for StubInspector {
    fn inspect(&self, image: &ImageInput) -> Result<ImageMetadata> {
        if image.bytes.is_empty() || image.bytes == b"corrupt" {
            return Err(Error::InvalidImage("cannot identify image file".to_string()));
        }
        Ok(ImageMetadata {
            filename: image.filename.clone(),
            size_bytes: image.bytes.len(),
            width: 640,
            height: 480,
            format: "jpeg".to_string(),
            has_exif: self.gps.is_some(),
            has_gps: self.gps.is_some(),
            latitude: self.gps.map(|g| g.0),
            longitude: self.gps.map(|g| g.1),
            ..Default::default()
        })
    }
}

pub struct StubLandmarks(pub Reply<Vec<LandmarkCandidate>>);

#[async_trait]
impl LandmarkDetector for StubLandmarks {
    async fn detect_landmarks(
        &self,
        _image: &ImageInput,
    ) -> std::result::Result<Vec<LandmarkCandidate>, ProviderError> {
        self.0.respond().await
    }
}

pub struct StubText(pub Reply<Vec<String>>);

#[async_trait]
impl TextDetector for StubText {
    async fn detect_text(&self, _image: &ImageInput) -> std::result::Result<Vec<String>, ProviderError> {
        self.0.respond().await
    }
}

pub struct StubObjects(pub Reply<Vec<DetectedObject>>);

#[async_trait]
impl ObjectDetector for StubObjects {
    async fn detect_objects(
        &self,
        _image: &ImageInput,
    ) -> std::result::Result<Vec<DetectedObject>, ProviderError> {
        self.0.respond().await
    }
}

/// Forward geocoder answering from a fixed table
#[derive(Default)]
pub struct StubGeocoder {
    pub name: &'static str,
    pub answers: HashMap<String, Vec<GeocodeCandidate>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            fail: true,
            ..Default::default()
        }
    }

    pub fn answer(mut self, query: &str, candidates: Vec<GeocodeCandidate>) -> Self {
        self.answers.insert(query.to_string(), candidates);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForwardGeocoder for StubGeocoder {
    fn name(&self) -> &str {
        self.name
    }

    async fn geocode(&self, query: &str) -> std::result::Result<Vec<GeocodeCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Unavailable("stub failure".to_string()));
        }
        Ok(self.answers.get(query).cloned().unwrap_or_default())
    }
}

/// Reverse geocoder with a single canned reply
pub struct StubReverse {
    pub reply: Reply<Option<AddressDetails>>,
    pub calls: AtomicUsize,
}

impl StubReverse {
    pub fn new(reply: Reply<Option<AddressDetails>>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseGeocoder for StubReverse {
    fn name(&self) -> &str {
        "stub_reverse"
    }

    async fn reverse_geocode(
        &self,
        _lat: f64,
        _lng: f64,
    ) -> std::result::Result<Option<AddressDetails>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.respond().await
    }
}

/// A two-hypothesis result with metadata, for formatter and server tests
pub fn sample_result() -> crate::hypothesis::AggregationResult {
    use crate::hypothesis::{AggregationResult, DataSource, LocationHypothesis, ProcessingMetadata};

    let eiffel = LocationHypothesis::new(48.8584, 2.2945, 0.875, DataSource::LandmarkDetection)
        .unwrap()
        .with_landmark("Eiffel Tower")
        .with_description("Landmark: Eiffel Tower")
        .with_address(&address("Champ de Mars, 75007 Paris", "Paris"));
    let cafe = LocationHypothesis::new(48.8606, 2.3376, 0.63, DataSource::OcrGeocoding)
        .unwrap()
        .with_description("Café <Louvre> & Co");

    let mut result = AggregationResult::succeeded(uuid::Uuid::new_v4(), vec![eiffel, cafe]);
    result.image_metadata = Some(ImageMetadata {
        filename: "paris.jpg".to_string(),
        size_bytes: 2048,
        width: 4032,
        height: 3024,
        format: "jpeg".to_string(),
        ..Default::default()
    });
    result.processing_metadata = Some(ProcessingMetadata {
        processing_time_ms: 412,
        apis_used: vec!["google_vision_landmark".to_string()],
        landmark_results_count: 1,
        ..Default::default()
    });
    result
}
