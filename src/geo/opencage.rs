//! OpenCage forward geocoding backend
//!
//! Requires an API key. OpenCage reports confidence on a 0-10 scale, which is
//! mapped to [0, 1].

use crate::constants::api::{OPENCAGE_URL, USER_AGENT};
use crate::provider::{AddressDetails, ForwardGeocoder, GeocodeCandidate, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;

const SEARCH_LIMIT: u32 = 5;

/// OpenCage geocoding backend
#[derive(Debug, Clone)]
pub struct OpenCageBackend {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    geometry: Option<Geometry>,
    confidence: Option<f64>,
    formatted: Option<String>,
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    country: Option<String>,
    country_code: Option<String>,
    state: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    postcode: Option<String>,
}

impl OpenCageBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
        }
    }

    fn candidates(response: OpenCageResponse) -> Vec<GeocodeCandidate> {
        response
            .results
            .into_iter()
            .filter_map(|r| {
                let geometry = r.geometry?;
                let c = r.components;
                Some(GeocodeCandidate {
                    latitude: geometry.lat,
                    longitude: geometry.lng,
                    // Missing confidence counts as the lowest non-zero grade
                    confidence: r.confidence.unwrap_or(1.0) / 10.0,
                    address: AddressDetails {
                        formatted_address: r.formatted,
                        country: c.country,
                        country_code: c.country_code,
                        admin_area: c.state,
                        locality: c.city.or(c.town).or(c.village),
                        postal_code: c.postcode,
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl ForwardGeocoder for OpenCageBackend {
    fn name(&self) -> &str {
        "opencage"
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .client
            .get(OPENCAGE_URL)
            .query(&[("q", query), ("key", self.api_key.as_str()), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "OpenCage returned status: {}",
                response.status()
            )));
        }

        let parsed: OpenCageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("OpenCage response: {}", e)))?;

        Ok(Self::candidates(parsed))
    }
}
