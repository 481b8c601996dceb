//! Error types for photo-geolocate

use crate::provider::ProviderError;
use thiserror::Error;

/// Main error type for photo-geolocate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid hypothesis: {0}")]
    InvalidHypothesis(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),
}

/// Result type alias for photo-geolocate operations
pub type Result<T> = std::result::Result<T, Error>;
