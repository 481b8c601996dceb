//! photo-geolocate: where was this photo taken?
//!
//! A library and CLI tool that estimates the location of a photograph by
//! combining several independent signals into ranked location hypotheses.
//!
//! ## Features
//!
//! - EXIF GPS extraction and image inspection
//! - Landmark, text and object detection via Google Cloud Vision
//! - OCR text geocoding through OpenCage and Nominatim
//! - Source-weighted, agreement-boosted ranking with deduplication
//! - Content-addressed result cache (memory + file) and run statistics
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use photo_geolocate::coord::{distance_km, Coordinates};
//! use photo_geolocate::hypothesis::{DataSource, LocationHypothesis};
//!
//! let eiffel = LocationHypothesis::new(48.8584, 2.2945, 0.9, DataSource::LandmarkDetection)
//!     .unwrap()
//!     .with_landmark("Eiffel Tower");
//! let louvre = Coordinates::new(48.8606, 2.3376);
//!
//! let km = distance_km(eiffel.coords(), louvre);
//! assert!(km > 3.0 && km < 3.5);
//! ```

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod format;
pub mod geo;
pub mod hypothesis;
pub mod provider;
pub mod server;
pub mod stats;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use aggregate::{Aggregator, Providers};
pub use config::Config;
pub use coord::Coordinates;
pub use error::{Error, Result};
pub use hypothesis::{AggregationRequest, AggregationResult, DataSource, LocationHypothesis, ProcessingMode};
pub use stats::{RunStats, StatsSnapshot};
