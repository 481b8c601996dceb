//! Geocoding module
//!
//! Turns OCR text into located candidates and coordinates into addresses.
//! Forward lookups ask every primary geocoder concurrently and fall back to a
//! secondary geocoder only when none of them found anything.

pub mod nominatim;
pub mod opencage;
pub mod query;

pub use query::{extract_location_queries, queries_for_texts};

use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::Error;
use crate::provider::{isolate, AddressDetails, ForwardGeocoder, GeocodeCandidate, Outcome, ReverseGeocoder};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A forward geocoding match and the query that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub query: String,
    pub candidate: GeocodeCandidate,
}

/// Everything learned from geocoding a set of text blocks
#[derive(Debug, Default)]
pub struct TextGeocoding {
    /// Queries actually sent
    pub queries: Vec<String>,
    /// Matches, deduplicated across all queries
    pub matches: Vec<QueryMatch>,
    /// One entry per failed geocoder call
    pub errors: Vec<String>,
}

/// Multi-backend geocoding with fallback
pub struct GeocodingService {
    primaries: Vec<Arc<dyn ForwardGeocoder>>,
    fallback: Option<Arc<dyn ForwardGeocoder>>,
    reverse: Vec<Arc<dyn ReverseGeocoder>>,
    timeout: Duration,
    max_queries: usize,
}

/// Drop candidates whose coordinates collapse onto an earlier one
fn dedup_candidates(candidates: Vec<GeocodeCandidate>) -> Vec<GeocodeCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(Coordinates::new(c.latitude, c.longitude).dedup_key()))
        .collect()
}

impl GeocodingService {
    /// Empty service; add backends with the `with_*` builders
    pub fn new(timeout: Duration, max_queries: usize) -> Self {
        Self {
            primaries: Vec::new(),
            fallback: None,
            reverse: Vec::new(),
            timeout,
            max_queries,
        }
    }

    /// Build the backends enabled in the configuration
    ///
    /// OpenCage is a primary when a key is set; Nominatim is the fallback and
    /// the reverse geocoder when enabled.
    pub fn from_config(config: &Config) -> Self {
        let mut service = Self::new(config.provider_timeout(), config.providers.max_geocode_queries);

        if !config.api_keys.opencage.is_empty() {
            service = service.with_primary(Arc::new(opencage::OpenCageBackend::new(
                &config.api_keys.opencage,
            )));
        }
        if config.providers.nominatim {
            let backend = Arc::new(nominatim::NominatimBackend::new());
            service = service
                .with_fallback(backend.clone())
                .with_reverse(backend);
        }

        service
    }

    pub fn with_primary(mut self, geocoder: Arc<dyn ForwardGeocoder>) -> Self {
        self.primaries.push(geocoder);
        self
    }

    pub fn with_fallback(mut self, geocoder: Arc<dyn ForwardGeocoder>) -> Self {
        self.fallback = Some(geocoder);
        self
    }

    pub fn with_reverse(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.reverse.push(geocoder);
        self
    }

    /// Whether any forward geocoder is configured
    pub fn has_forward(&self) -> bool {
        !self.primaries.is_empty() || self.fallback.is_some()
    }

    /// Whether any reverse geocoder is configured
    pub fn has_reverse(&self) -> bool {
        !self.reverse.is_empty()
    }

    /// Names of configured forward geocoders, primaries first
    pub fn forward_names(&self) -> Vec<String> {
        self.primaries
            .iter()
            .chain(self.fallback.iter())
            .map(|g| g.name().to_string())
            .collect()
    }

    /// Geocode one query
    ///
    /// Returns matches deduplicated within the query, plus failure messages.
    pub async fn geocode_query(&self, query: &str) -> (Vec<GeocodeCandidate>, Vec<String>) {
        let outcomes = join_all(
            self.primaries
                .iter()
                .map(|g| isolate(g.name(), self.timeout, g.geocode(query))),
        )
        .await;

        let failed = |message: String| Error::Geocoding(format!("{} (query \"{}\")", message, query)).to_string();

        let mut errors = Vec::new();
        let mut found = Vec::new();
        for outcome in outcomes {
            errors.extend(outcome.error.map(failed));
            found.extend(outcome.value);
        }

        if found.is_empty() {
            if let Some(fallback) = &self.fallback {
                debug!(query, geocoder = fallback.name(), "Trying fallback geocoder");
                let outcome = isolate(fallback.name(), self.timeout, fallback.geocode(query)).await;
                errors.extend(outcome.error.map(failed));
                found = outcome.value;
            }
        }

        (dedup_candidates(found), errors)
    }

    /// Extract queries from OCR text and geocode them concurrently
    pub async fn geocode_texts(&self, texts: &[String]) -> TextGeocoding {
        if !self.has_forward() {
            return TextGeocoding::default();
        }
        let queries = queries_for_texts(texts, self.max_queries);

        let per_query = join_all(queries.iter().map(|q| self.geocode_query(q))).await;

        let mut seen = HashSet::new();
        let mut result = TextGeocoding::default();
        for (query, (candidates, errors)) in queries.iter().zip(per_query) {
            result.errors.extend(errors);
            for candidate in candidates {
                let key = Coordinates::new(candidate.latitude, candidate.longitude).dedup_key();
                if seen.insert(key) {
                    result.matches.push(QueryMatch {
                        query: query.clone(),
                        candidate,
                    });
                }
            }
        }
        result.queries = queries;

        info!(
            queries = result.queries.len(),
            matches = result.matches.len(),
            "Text geocoding completed"
        );
        result
    }

    /// Address for a position; the first reverse geocoder with an answer wins
    pub async fn reverse_geocode(&self, lat: f64, lng: f64) -> Outcome<Option<AddressDetails>> {
        let mut errors = Vec::new();
        for geocoder in &self.reverse {
            let outcome = isolate(geocoder.name(), self.timeout, geocoder.reverse_geocode(lat, lng)).await;
            errors.extend(outcome.error);
            if outcome.value.is_some() {
                return Outcome {
                    value: outcome.value,
                    error: None,
                };
            }
        }

        Outcome {
            value: None,
            error: (!errors.is_empty()).then(|| {
                Error::Geocoding(format!("{} at ({:.4}, {:.4})", errors.join("; "), lat, lng)).to_string()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{address, geocode_match, Reply, StubGeocoder, StubReverse};

    fn service() -> GeocodingService {
        GeocodingService::new(Duration::from_millis(200), 10)
    }

    #[tokio::test]
    async fn test_primaries_merged_and_deduplicated() {
        let a = StubGeocoder::named("a").answer(
            "Louvre",
            vec![
                geocode_match(48.86061, 2.33764, 0.9, "Louvre A"),
                geocode_match(48.86062, 2.33764, 0.8, "Louvre A dup"),
            ],
        );
        let b = StubGeocoder::named("b").answer("Louvre", vec![geocode_match(48.8611, 2.3360, 0.6, "Louvre B")]);
        let svc = service().with_primary(Arc::new(a)).with_primary(Arc::new(b));

        let (found, errors) = svc.geocode_query("Louvre").await;
        assert!(errors.is_empty());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].address.formatted_address.as_deref(), Some("Louvre A"));
        assert_eq!(found[1].address.formatted_address.as_deref(), Some("Louvre B"));
    }

    #[tokio::test]
    async fn test_fallback_only_when_primaries_empty() {
        let primary = Arc::new(StubGeocoder::named("primary").answer("Paris", vec![geocode_match(48.85, 2.35, 0.9, "P")]));
        let fallback = Arc::new(StubGeocoder::named("fallback").answer("Lyon", vec![geocode_match(45.76, 4.83, 0.5, "L")]));
        let svc = service()
            .with_primary(primary.clone())
            .with_fallback(fallback.clone());

        let (found, _) = svc.geocode_query("Paris").await;
        assert_eq!(found.len(), 1);
        assert_eq!(fallback.call_count(), 0);

        let (found, _) = svc.geocode_query("Lyon").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].latitude, 45.76);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_primary_is_isolated() {
        let svc = service()
            .with_primary(Arc::new(StubGeocoder::failing("broken")))
            .with_fallback(Arc::new(
                StubGeocoder::named("fallback").answer("Rome", vec![geocode_match(41.9, 12.5, 0.5, "Rome")]),
            ));

        let (found, errors) = svc.geocode_query("Rome").await;
        assert_eq!(found.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Geocoding error: broken:"));
        assert!(errors[0].ends_with("(query \"Rome\")"));
    }

    #[tokio::test]
    async fn test_geocode_texts_cross_query_dedup() {
        let geocoder = StubGeocoder::named("g")
            .answer("Trafalgar", vec![geocode_match(51.5080, -0.1281, 0.9, "Trafalgar Square")])
            .answer("Westminster", vec![
                geocode_match(51.50801, -0.12811, 0.8, "Westminster"),
                geocode_match(51.4975, -0.1357, 0.7, "Westminster Abbey"),
            ]);
        let svc = service().with_primary(Arc::new(geocoder));

        let texts = vec!["Trafalgar".to_string(), "Westminster".to_string()];
        let result = svc.geocode_texts(&texts).await;

        assert_eq!(result.queries, vec!["Trafalgar", "Westminster"]);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].query, "Trafalgar");
        assert_eq!(result.matches[1].query, "Westminster");
        assert_eq!(result.matches[1].candidate.latitude, 51.4975);
    }

    #[tokio::test]
    async fn test_geocode_texts_respects_query_cap() {
        let geocoder = Arc::new(StubGeocoder::named("g"));
        let svc = GeocodingService::new(Duration::from_millis(200), 2).with_primary(geocoder.clone());

        let texts = vec!["Berlin Munich Hamburg".to_string()];
        let result = svc.geocode_texts(&texts).await;
        assert_eq!(result.queries.len(), 2);
        assert_eq!(geocoder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_geocode_texts_without_backends() {
        let result = service().geocode_texts(&["Paris".to_string()]).await;
        assert!(result.queries.is_empty());
        assert!(result.matches.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_first_answer_wins() {
        let failing = Arc::new(StubReverse::new(Reply::Fail("quota")));
        let first = Arc::new(StubReverse::new(Reply::Ok(Some(address("Champ de Mars", "Paris")))));
        let second = Arc::new(StubReverse::new(Reply::Ok(Some(address("Elsewhere", "Lyon")))));
        let svc = service()
            .with_reverse(failing.clone())
            .with_reverse(first.clone())
            .with_reverse(second.clone());

        let outcome = svc.reverse_geocode(48.8584, 2.2945).await;
        assert_eq!(outcome.value.unwrap().locality.as_deref(), Some("Paris"));
        assert!(outcome.error.is_none());
        assert_eq!(failing.call_count(), 1);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reverse_all_fail() {
        let svc = service()
            .with_reverse(Arc::new(StubReverse::new(Reply::Hang)))
            .with_reverse(Arc::new(StubReverse::new(Reply::Ok(None))));

        let outcome = svc.reverse_geocode(0.0, 0.0).await;
        assert!(outcome.value.is_none());
        let error = outcome.error.unwrap();
        assert!(error.starts_with("Geocoding error:"));
        assert!(error.contains("timed out"));
        assert!(error.ends_with("at (0.0000, 0.0000)"));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        let svc = GeocodingService::from_config(&config);
        assert_eq!(svc.forward_names(), vec!["nominatim"]);
        assert!(svc.has_reverse());

        config.api_keys.opencage = "key".to_string();
        config.providers.nominatim = false;
        let svc = GeocodingService::from_config(&config);
        assert_eq!(svc.forward_names(), vec!["opencage"]);
        assert!(!svc.has_reverse());
    }
}
