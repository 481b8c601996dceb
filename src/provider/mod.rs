//! Signal providers
//!
//! Each provider wraps one external source of location evidence. Providers
//! report their own failures as [`ProviderError`]; the aggregator never sees
//! those errors directly because every call goes through [`isolate`], which
//! collapses a failure or timeout into an empty contribution plus a message.

pub mod inspector;
pub mod vision;

pub use inspector::ExifInspector;
pub use vision::VisionClient;

use crate::error::Result;
use crate::hypothesis::ImageMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Failure of a single provider call
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("timed out after {0}")]
    Timeout(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// An image handed to the pipeline
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read an image from disk
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// A recognised landmark with its position
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkCandidate {
    pub name: String,
    pub score: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A detected object label
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub name: String,
    pub score: f64,
}

/// Structured address returned by geocoders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub formatted_address: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub admin_area: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
}

/// One forward geocoding match
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub address: AddressDetails,
}

/// Decodes an image and reads its metadata
pub trait ImageInspector: Send + Sync {
    /// Fails only when the image cannot be decoded or is not acceptable
    fn inspect(&self, image: &ImageInput) -> Result<ImageMetadata>;
}

#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    async fn detect_landmarks(
        &self,
        image: &ImageInput,
    ) -> std::result::Result<Vec<LandmarkCandidate>, ProviderError>;
}

#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect_text(&self, image: &ImageInput) -> std::result::Result<Vec<String>, ProviderError>;
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect_objects(
        &self,
        image: &ImageInput,
    ) -> std::result::Result<Vec<DetectedObject>, ProviderError>;
}

/// Place name to coordinates
#[async_trait]
pub trait ForwardGeocoder: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    async fn geocode(&self, query: &str) -> std::result::Result<Vec<GeocodeCandidate>, ProviderError>;
}

/// Coordinates to address
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    fn name(&self) -> &str;

    async fn reverse_geocode(
        &self,
        lat: f64,
        lng: f64,
    ) -> std::result::Result<Option<AddressDetails>, ProviderError>;
}

/// Result of an isolated provider call
#[derive(Debug)]
pub struct Outcome<T> {
    /// Provider output, or the empty value on failure
    pub value: T,
    /// Failure description, if the call failed
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }
}

/// Run a provider call with a timeout, collapsing any failure to `T::default()`
///
/// Failures are logged at `warn` and returned as `"{provider}: {error}"`.
pub async fn isolate<T, F>(provider: &str, timeout: Duration, call: F) -> Outcome<T>
where
    T: Default,
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(format!("{:?}", timeout))),
    };

    match result {
        Ok(value) => Outcome::ok(value),
        Err(e) => {
            warn!(provider, error = %e, "Provider call failed");
            Outcome {
                value: T::default(),
                error: Some(format!("{}: {}", provider, e)),
            }
        }
    }
}
