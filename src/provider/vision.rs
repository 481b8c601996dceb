//! Google Cloud Vision backend
//!
//! Calls the `images:annotate` REST endpoint with an API key. One feature is
//! requested per call so landmark, text and object detection can run
//! concurrently and fail independently.

use crate::constants::api::{USER_AGENT, VISION_ANNOTATE_URL};
use crate::provider::{
    DetectedObject, ImageInput, LandmarkCandidate, LandmarkDetector, ObjectDetector,
    ProviderError, TextDetector,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MAX_FEATURE_RESULTS: u32 = 10;

/// Vision API features used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Landmarks,
    Text,
    Objects,
}

impl Feature {
    fn api_name(self) -> &'static str {
        match self {
            Self::Landmarks => "LANDMARK_DETECTION",
            Self::Text => "TEXT_DETECTION",
            Self::Objects => "OBJECT_LOCALIZATION",
        }
    }
}

/// Client for the Vision REST API
#[derive(Debug, Clone)]
pub struct VisionClient {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    landmark_min_score: f64,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: RequestImage,
    features: Vec<RequestFeature<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestImage {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestFeature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    max_results: u32,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    landmark_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    localized_object_annotations: Vec<ObjectAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    locations: Vec<LocationInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationInfo {
    lat_lng: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ObjectAnnotation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

impl VisionClient {
    /// Create a client; without an API key every call reports `Unavailable`
    pub fn new(api_key: Option<String>, landmark_min_score: f64) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: VISION_ANNOTATE_URL.to_string(),
            landmark_min_score,
        }
    }

    /// Whether an API key is configured
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn annotate(
        &self,
        image: &ImageInput,
        feature: Feature,
    ) -> Result<AnnotateImageResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("Vision API key not configured".to_string()))?;

        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: RequestImage {
                    content: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                },
                features: vec![RequestFeature {
                    kind: feature.api_name(),
                    max_results: MAX_FEATURE_RESULTS,
                }],
            }],
        };

        debug!(feature = feature.api_name(), filename = %image.filename, "Calling Vision API");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "Vision API returned status: {}",
                response.status()
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        first_response(parsed)
    }
}

/// Take the single per-image response, surfacing an embedded API error
fn first_response(parsed: AnnotateResponse) -> Result<AnnotateImageResponse, ProviderError> {
    let response = parsed.responses.into_iter().next().unwrap_or_default();
    if let Some(status) = &response.error {
        if !status.message.is_empty() {
            return Err(ProviderError::Request(status.message.clone()));
        }
    }
    Ok(response)
}

/// One candidate per reported location of each landmark scoring at least `min_score`
fn landmarks_from(response: AnnotateImageResponse, min_score: f64) -> Vec<LandmarkCandidate> {
    response
        .landmark_annotations
        .into_iter()
        .filter(|l| l.score >= min_score)
        .flat_map(|l| {
            let name = l.description;
            let score = l.score;
            l.locations
                .into_iter()
                .filter_map(|loc| loc.lat_lng)
                .map(move |ll| LandmarkCandidate {
                    name: name.clone(),
                    score,
                    latitude: ll.latitude,
                    longitude: ll.longitude,
                })
        })
        .collect()
}

/// Trimmed text blocks longer than two characters
fn texts_from(response: AnnotateImageResponse) -> Vec<String> {
    response
        .text_annotations
        .into_iter()
        .map(|t| t.description.trim().to_string())
        .filter(|t| t.chars().count() > 2)
        .collect()
}

fn objects_from(response: AnnotateImageResponse) -> Vec<DetectedObject> {
    response
        .localized_object_annotations
        .into_iter()
        .map(|o| DetectedObject {
            name: o.name,
            score: o.score,
        })
        .collect()
}

#[async_trait]
impl LandmarkDetector for VisionClient {
    async fn detect_landmarks(
        &self,
        image: &ImageInput,
    ) -> Result<Vec<LandmarkCandidate>, ProviderError> {
        let response = self.annotate(image, Feature::Landmarks).await?;
        let landmarks = landmarks_from(response, self.landmark_min_score);
        info!(count = landmarks.len(), "Landmark detection completed");
        Ok(landmarks)
    }
}

#[async_trait]
impl TextDetector for VisionClient {
    async fn detect_text(&self, image: &ImageInput) -> Result<Vec<String>, ProviderError> {
        let response = self.annotate(image, Feature::Text).await?;
        let texts = texts_from(response);
        info!(count = texts.len(), "Text detection completed");
        Ok(texts)
    }
}

#[async_trait]
impl ObjectDetector for VisionClient {
    async fn detect_objects(&self, image: &ImageInput) -> Result<Vec<DetectedObject>, ProviderError> {
        let response = self.annotate(image, Feature::Objects).await?;
        let objects = objects_from(response);
        info!(count = objects.len(), "Object detection completed");
        Ok(objects)
    }
}
