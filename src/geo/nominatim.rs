//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for forward and reverse geocoding.
//! Rate limit: 1 request per second (enforced by User-Agent requirement)

use crate::constants::api::{NOMINATIM_URL, USER_AGENT};
use crate::provider::{AddressDetails, ForwardGeocoder, GeocodeCandidate, ProviderError, ReverseGeocoder};
use async_trait::async_trait;
use serde::Deserialize;

/// Nominatim results carry no usable score
const FORWARD_CONFIDENCE: f64 = 0.5;

const SEARCH_LIMIT: u32 = 5;

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Nominatim search/reverse response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    country: Option<String>,
    country_code: Option<String>,
    state: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    postcode: Option<String>,
}

impl NominatimBackend {
    /// Create a new Nominatim backend
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: NOMINATIM_URL.to_string(),
        }
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lng: &str) -> Result<(f64, f64), ProviderError> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| ProviderError::Malformed(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| ProviderError::Malformed(format!("Invalid longitude: {}", lng)))?;
        Ok((lat, lng))
    }

    fn address_details(result: &NominatimResult) -> AddressDetails {
        let address = result.address.as_ref();
        AddressDetails {
            formatted_address: result.display_name.clone(),
            country: address.and_then(|a| a.country.clone()),
            country_code: address.and_then(|a| a.country_code.clone()),
            admin_area: address.and_then(|a| a.state.clone()),
            locality: address.and_then(|a| {
                a.city
                    .clone()
                    .or_else(|| a.town.clone())
                    .or_else(|| a.village.clone())
            }),
            postal_code: address.and_then(|a| a.postcode.clone()),
        }
    }

    fn to_candidate(result: NominatimResult) -> Result<GeocodeCandidate, ProviderError> {
        let (latitude, longitude) = Self::parse_coords(&result.lat, &result.lon)?;
        Ok(GeocodeCandidate {
            latitude,
            longitude,
            confidence: FORWARD_CONFIDENCE,
            address: Self::address_details(&result),
        })
    }
}

impl Default for NominatimBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForwardGeocoder for NominatimBackend {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let url = format!(
            "{}/search?q={}&format=json&limit={}&addressdetails=1",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("Nominatim response: {}", e)))?;

        results.into_iter().map(Self::to_candidate).collect()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimBackend {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Option<AddressDetails>, ProviderError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1",
            self.base_url, lat, lng
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            return Err(ProviderError::Request(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        // Unknown locations come back as {"error": "Unable to geocode"}
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("Nominatim response: {}", e)))?;
        if value.get("error").is_some() {
            return Ok(None);
        }

        let result: NominatimResult = serde_json::from_value(value)
            .map_err(|e| ProviderError::Malformed(format!("Nominatim response: {}", e)))?;
        Ok(Some(Self::address_details(&result)))
    }
}
