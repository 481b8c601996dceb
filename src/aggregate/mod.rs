//! Hypothesis aggregation
//!
//! The [`Aggregator`] runs one image through every provider its processing
//! mode enables, turns the candidates into [`LocationHypothesis`] values, ranks
//! them and optionally enriches the survivors with addresses. Results are
//! cached by content fingerprint and every request is counted in the injected
//! [`RunStats`].

pub mod rank;

pub use rank::rank_hypotheses;

use crate::cache::{content_hash, fingerprint, CacheStats, ResultCache};
use crate::config::Config;
use crate::constants::ranking::MAX_RESULTS_LIMIT;
use crate::geo::{GeocodingService, TextGeocoding};
use crate::hypothesis::{
    AggregationRequest, AggregationResult, Capability, DataSource, ImageMetadata,
    LocationHypothesis, ProcessingMetadata,
};
use crate::provider::{
    isolate, DetectedObject, ExifInspector, ImageInput, ImageInspector, LandmarkCandidate,
    LandmarkDetector, ObjectDetector, Outcome, TextDetector, VisionClient,
};
use crate::stats::{RunStats, StatsSnapshot};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Labels recorded in `processing_metadata.apis_used`
pub mod api_label {
    pub const LANDMARKS: &str = "google_vision_landmark";
    pub const TEXT: &str = "google_vision_text";
    pub const GEOCODING: &str = "geocoding_services";
    pub const OBJECTS: &str = "google_vision_objects";
    pub const REVERSE_GEOCODING: &str = "reverse_geocoding";
}

/// Object labels that name location-bearing structures
const LOCATION_OBJECT_LABELS: &[&str] = &[
    "tower",
    "bridge",
    "church",
    "cathedral",
    "museum",
    "monument",
    "stadium",
    "airport",
    "train station",
    "university",
    "hospital",
];

const EXIF_DESCRIPTION: &str = "GPS coordinates from image EXIF data";

/// The providers an aggregator draws on
pub struct Providers {
    pub inspector: Arc<dyn ImageInspector>,
    pub landmarks: Option<Arc<dyn LandmarkDetector>>,
    pub text: Option<Arc<dyn TextDetector>>,
    pub objects: Option<Arc<dyn ObjectDetector>>,
    pub geocoding: Arc<GeocodingService>,
}

impl Providers {
    /// Only the image inspector; detectors and geocoders are added with `with_*`
    pub fn new(inspector: Arc<dyn ImageInspector>, geocoding: GeocodingService) -> Self {
        Self {
            inspector,
            landmarks: None,
            text: None,
            objects: None,
            geocoding: Arc::new(geocoding),
        }
    }

    pub fn with_landmarks(mut self, detector: Arc<dyn LandmarkDetector>) -> Self {
        self.landmarks = Some(detector);
        self
    }

    pub fn with_text(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.text = Some(detector);
        self
    }

    pub fn with_objects(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.objects = Some(detector);
        self
    }

    /// Providers backed by the configured external services
    ///
    /// Without a Vision API key only EXIF and geocoding are available.
    pub fn from_config(config: &Config) -> Self {
        let inspector = Arc::new(ExifInspector::new(config.server.max_upload_bytes));
        let providers = Self::new(inspector, GeocodingService::from_config(config));

        let vision = Arc::new(VisionClient::new(
            Some(config.api_keys.google_vision.clone()),
            config.providers.landmark_min_score,
        ));
        if !vision.is_available() {
            warn!("No Google Vision API key configured, landmark and text detection disabled");
            return providers;
        }

        providers
            .with_landmarks(vision.clone())
            .with_text(vision.clone())
            .with_objects(vision)
    }
}

/// Which providers are wired in, for health reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub landmark_detection: bool,
    pub text_detection: bool,
    pub object_detection: bool,
    pub forward_geocoders: Vec<String>,
    pub reverse_geocoding: bool,
    pub durable_cache: bool,
}

/// Signals gathered from the concurrent detection stage
#[derive(Default)]
struct Signals {
    landmarks: Vec<LandmarkCandidate>,
    texts: Vec<String>,
    geocoding: TextGeocoding,
    objects: Vec<DetectedObject>,
}

/// Orchestrates providers, ranking, cache and statistics
pub struct Aggregator {
    providers: Providers,
    cache: Arc<ResultCache>,
    stats: Arc<RunStats>,
    provider_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        providers: Providers,
        cache: Arc<ResultCache>,
        stats: Arc<RunStats>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            cache,
            stats,
            provider_timeout,
        }
    }

    /// Aggregator wired from the configuration file
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Providers::from_config(config),
            Arc::new(ResultCache::from_config(config)),
            Arc::new(RunStats::new(config.cache.latency_window)),
            config.provider_timeout(),
        )
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cached result, returning how many were removed
    pub async fn clear_cache(&self) -> usize {
        self.cache.invalidate_all().await
    }

    pub fn provider_status(&self) -> ProviderStatus {
        ProviderStatus {
            landmark_detection: self.providers.landmarks.is_some(),
            text_detection: self.providers.text.is_some(),
            object_detection: self.providers.objects.is_some(),
            forward_geocoders: self.providers.geocoding.forward_names(),
            reverse_geocoding: self.providers.geocoding.has_reverse(),
            durable_cache: self.cache.has_durable(),
        }
    }

    /// Locate one image
    ///
    /// Never fails: an unreadable image or an invalid request comes back as a
    /// result with `success == false`.
    pub async fn aggregate(&self, image: &ImageInput, request: &AggregationRequest) -> AggregationResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("aggregate", %request_id, filename = %image.filename);
        self.aggregate_inner(request_id, image, request)
            .instrument(span)
            .await
    }

    async fn aggregate_inner(
        &self,
        request_id: Uuid,
        image: &ImageInput,
        request: &AggregationRequest,
    ) -> AggregationResult {
        let started = Instant::now();
        self.stats.record_request();

        if let Err(e) = request.validate() {
            return self.fail(request_id, request, started, e.to_string());
        }

        let key = fingerprint(&content_hash(&image.bytes), request.mode, request.min_confidence);
        if let Some(mut cached) = self.cache.get(&key).await {
            debug!(key, "Returning cached result");
            self.stats.record_cache_hit();
            self.enrich_top(&mut cached, request).await;
            self.stats.record_success(elapsed_ms(started));
            return shape(cached, request);
        }

        let image_metadata = match self.providers.inspector.inspect(image) {
            Ok(metadata) => metadata,
            Err(e) => {
                let message = format!("Error processing image: {}", e);
                return self.fail(request_id, request, started, message);
            }
        };

        let mut metadata = ProcessingMetadata::default();
        let hypotheses = self.locate(image, request, &image_metadata, &mut metadata).await;

        // Cached entries keep every ranked hypothesis and their metadata;
        // each caller's view is cut from them by `shape`.
        let mut result = AggregationResult::succeeded(request_id, hypotheses);
        result.image_metadata = Some(image_metadata);
        result.processing_metadata = Some(metadata);
        self.enrich_top(&mut result, request).await;

        let elapsed = elapsed_ms(started);
        if let Some(metadata) = result.processing_metadata.as_mut() {
            metadata.processing_time_ms = elapsed;
        }
        info!(
            hypotheses = result.hypotheses.len(),
            elapsed_ms = elapsed,
            "Aggregation completed"
        );

        self.cache.set(&key, &result, None).await;
        self.stats.record_success(elapsed);
        shape(result, request)
    }

    fn fail(
        &self,
        request_id: Uuid,
        request: &AggregationRequest,
        started: Instant,
        message: String,
    ) -> AggregationResult {
        warn!(error = %message, "Aggregation failed");
        self.stats.record_failure();

        let mut result = AggregationResult::failed(request_id, message.clone());
        if request.include_metadata {
            result.processing_metadata = Some(ProcessingMetadata {
                processing_time_ms: elapsed_ms(started),
                error_messages: vec![message],
                ..Default::default()
            });
        }
        result
    }

    /// Collect, rank and enrich hypotheses for a decoded image
    async fn locate(
        &self,
        image: &ImageInput,
        request: &AggregationRequest,
        image_metadata: &ImageMetadata,
        metadata: &mut ProcessingMetadata,
    ) -> Vec<LocationHypothesis> {
        let mut raw = Vec::new();

        if request.mode.enables(Capability::ExifGps) {
            if let Some((lat, lng)) = image_metadata.gps() {
                match LocationHypothesis::new(lat, lng, 1.0, DataSource::ExifGps) {
                    Ok(h) => raw.push(h.with_description(EXIF_DESCRIPTION)),
                    Err(e) => {
                        debug!(error = %e, "Discarding EXIF position");
                        metadata.discarded_candidates += 1;
                    }
                }
            }
        }

        let signals = self.detect(image, request, metadata).await;
        metadata.landmark_results_count = signals.landmarks.len();
        metadata.text_results_count = signals.texts.len();
        metadata.geocoding_queries_count = signals.geocoding.queries.len();
        metadata.object_results_count = signals.objects.len();
        metadata.location_objects = location_objects(&signals.objects);
        metadata.error_messages.extend(signals.geocoding.errors.iter().cloned());

        for candidate in &signals.landmarks {
            let built = LocationHypothesis::new(
                candidate.latitude,
                candidate.longitude,
                candidate.score,
                DataSource::LandmarkDetection,
            );
            match built {
                Ok(h) => raw.push(
                    h.with_landmark(&candidate.name)
                        .with_description(format!("Landmark: {}", candidate.name)),
                ),
                Err(e) => {
                    debug!(landmark = %candidate.name, error = %e, "Discarding landmark");
                    metadata.discarded_candidates += 1;
                }
            }
        }

        for m in &signals.geocoding.matches {
            let c = &m.candidate;
            match LocationHypothesis::new(c.latitude, c.longitude, c.confidence, DataSource::OcrGeocoding) {
                Ok(h) => {
                    let description = c
                        .address
                        .formatted_address
                        .clone()
                        .unwrap_or_else(|| m.query.clone());
                    raw.push(h.with_address(&c.address).with_description(description));
                }
                Err(e) => {
                    debug!(query = %m.query, error = %e, "Discarding geocoding match");
                    metadata.discarded_candidates += 1;
                }
            }
        }

        debug!(candidates = raw.len(), "Ranking candidates");
        let uncapped = AggregationRequest {
            max_results: MAX_RESULTS_LIMIT,
            ..request.clone()
        };
        rank_hypotheses(raw, &uncapped)
    }

    /// Run every enabled detector concurrently
    async fn detect(
        &self,
        image: &ImageInput,
        request: &AggregationRequest,
        metadata: &mut ProcessingMetadata,
    ) -> Signals {
        let timeout = self.provider_timeout;
        let mode = request.mode;

        let landmarks = async {
            match &self.providers.landmarks {
                Some(d) if mode.enables(Capability::Landmarks) => {
                    Some(isolate("landmark_detection", timeout, d.detect_landmarks(image)).await)
                }
                _ => None,
            }
        };

        let text = async {
            match &self.providers.text {
                Some(d) if mode.enables(Capability::TextGeocoding) => {
                    let texts = isolate("text_detection", timeout, d.detect_text(image)).await;
                    let geocoding = self.providers.geocoding.geocode_texts(&texts.value).await;
                    Some((texts, geocoding))
                }
                _ => None,
            }
        };

        let objects = async {
            match &self.providers.objects {
                Some(d) if mode.enables(Capability::Objects) => {
                    Some(isolate("object_detection", timeout, d.detect_objects(image)).await)
                }
                _ => None,
            }
        };

        let (landmarks, text, objects) = tokio::join!(landmarks, text, objects);

        let mut signals = Signals::default();
        if let Some(outcome) = landmarks {
            metadata.apis_used.push(api_label::LANDMARKS.to_string());
            signals.landmarks = take(outcome, metadata);
        }
        if let Some((texts, geocoding)) = text {
            metadata.apis_used.push(api_label::TEXT.to_string());
            signals.texts = take(texts, metadata);
            if !geocoding.queries.is_empty() {
                metadata.apis_used.push(api_label::GEOCODING.to_string());
            }
            signals.geocoding = geocoding;
        }
        if let Some(outcome) = objects {
            metadata.apis_used.push(api_label::OBJECTS.to_string());
            signals.objects = take(outcome, metadata);
        }
        signals
    }

    /// Enrich the hypotheses the caller will actually see
    async fn enrich_top(&self, result: &mut AggregationResult, request: &AggregationRequest) {
        if !request.include_address {
            return;
        }
        let visible = request.max_results.min(result.hypotheses.len());
        let metadata = result.processing_metadata.get_or_insert_with(Default::default);
        self.enrich(&mut result.hypotheses[..visible], metadata).await;
    }

    /// Attach addresses to hypotheses that lack one
    async fn enrich(&self, hypotheses: &mut [LocationHypothesis], metadata: &mut ProcessingMetadata) {
        let geocoding = &self.providers.geocoding;
        if !geocoding.has_reverse() {
            return;
        }

        let pending: Vec<usize> = hypotheses
            .iter()
            .enumerate()
            .filter(|(_, h)| h.address.is_none())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return;
        }

        let lookups = pending.iter().map(|&i| {
            let (lat, lng) = (hypotheses[i].latitude, hypotheses[i].longitude);
            geocoding.reverse_geocode(lat, lng)
        });
        let outcomes = join_all(lookups).await;
        if !metadata.apis_used.iter().any(|api| api == api_label::REVERSE_GEOCODING) {
            metadata.apis_used.push(api_label::REVERSE_GEOCODING.to_string());
        }

        for (i, outcome) in pending.into_iter().zip(outcomes) {
            metadata.error_messages.extend(outcome.error);
            if let Some(details) = outcome.value {
                hypotheses[i].apply_address(&details);
            }
        }
    }
}

/// Cut a full result down to what one request asked for
fn shape(result: AggregationResult, request: &AggregationRequest) -> AggregationResult {
    let mut result = result.truncated(request.max_results);
    if !request.include_metadata {
        result.image_metadata = None;
        result.processing_metadata = None;
    }
    result
}

/// Unwrap an isolated outcome, recording its error
fn take<T>(outcome: Outcome<T>, metadata: &mut ProcessingMetadata) -> T {
    metadata.error_messages.extend(outcome.error);
    outcome.value
}

/// Object names matching a location-bearing label, first occurrence only
fn location_objects(objects: &[DetectedObject]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for object in objects {
        let name = object.name.to_lowercase();
        let bearing = LOCATION_OBJECT_LABELS.iter().any(|label| name.contains(label));
        if bearing && !found.iter().any(|f| f.eq_ignore_ascii_case(&object.name)) {
            found.push(object.name.clone());
        }
    }
    found
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::ProcessingMode;
    use crate::testing::{
        address, geocode_match, landmark, Reply, StubGeocoder, StubInspector, StubLandmarks,
        StubObjects, StubReverse, StubText,
    };
    use approx::assert_relative_eq;

    fn geocoding() -> GeocodingService {
        GeocodingService::new(Duration::from_millis(200), 10)
    }

    fn aggregator(providers: Providers) -> Aggregator {
        Aggregator::new(
            providers,
            Arc::new(ResultCache::default()),
            Arc::new(RunStats::default()),
            Duration::from_millis(200),
        )
    }

    fn image() -> ImageInput {
        ImageInput::new("photo.jpg", b"jpeg bytes".to_vec())
    }

    fn request(mode: ProcessingMode) -> AggregationRequest {
        AggregationRequest {
            include_address: false,
            ..AggregationRequest::with_mode(mode)
        }
    }

    fn object(name: &str) -> DetectedObject {
        DetectedObject {
            name: name.to_string(),
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn test_exif_only() {
        let agg = aggregator(Providers::new(
            Arc::new(StubInspector::with_gps(48.8584, 2.2945)),
            geocoding(),
        ));
        let result = agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;

        assert!(result.success);
        assert_eq!(result.hypotheses.len(), 1);
        let best = result.best_guess.unwrap();
        assert_eq!(best.source, DataSource::ExifGps);
        assert_eq!(best.confidence, 1.0);
        assert_eq!(best.latitude, 48.8584);
        assert_eq!(best.description.as_deref(), Some(EXIF_DESCRIPTION));

        let image_meta = result.image_metadata.unwrap();
        assert!(image_meta.has_gps);
        assert_eq!(result.processing_metadata.unwrap().apis_used, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_two_landmarks_agree() {
        let landmarks = StubLandmarks(Reply::Ok(vec![
            landmark("Eiffel Tower", 0.95, 48.8584, 2.2945),
            landmark("Somewhere North", 0.8, 49.1284, 2.2945),
        ]));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding())
                .with_landmarks(Arc::new(landmarks)),
        );
        let result = agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;

        assert_eq!(result.hypotheses.len(), 2);
        assert_relative_eq!(result.hypotheses[0].confidence, 0.875, epsilon = 1e-9);
        assert_relative_eq!(result.hypotheses[1].confidence, 0.74, epsilon = 1e-9);
        assert_eq!(result.hypotheses[0].landmark_name.as_deref(), Some("Eiffel Tower"));

        let meta = result.processing_metadata.unwrap();
        assert_eq!(meta.landmark_results_count, 2);
        assert_eq!(meta.apis_used, vec![api_label::LANDMARKS.to_string()]);
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_still_success() {
        let service = geocoding().with_primary(Arc::new(StubGeocoder::failing("broken")));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), service)
                .with_landmarks(Arc::new(StubLandmarks(Reply::Fail("quota exceeded"))))
                .with_text(Arc::new(StubText(Reply::Ok(vec!["Grand Central".to_string()]))))
                .with_objects(Arc::new(StubObjects(Reply::Fail("quota exceeded")))),
        );
        let result = agg
            .aggregate(&image(), &request(ProcessingMode::Comprehensive))
            .await;

        assert!(result.success);
        assert!(result.hypotheses.is_empty());
        assert!(result.best_guess.is_none());
        assert!(result.error_message.is_none());

        let meta = result.processing_metadata.unwrap();
        assert!(meta.error_messages.iter().any(|m| m.starts_with("landmark_detection:")));
        assert!(meta.error_messages.iter().any(|m| m.starts_with("object_detection:")));
        assert!(meta.error_messages.iter().any(|m| m.starts_with("Geocoding error: broken:")));
    }

    #[tokio::test]
    async fn test_corrupt_image_fails() {
        let agg = aggregator(Providers::new(Arc::new(StubInspector::default()), geocoding()));
        let corrupt = ImageInput::new("bad.jpg", b"corrupt".to_vec());
        let result = agg.aggregate(&corrupt, &request(ProcessingMode::Standard)).await;

        assert!(!result.success);
        assert!(result.hypotheses.is_empty());
        let message = result.error_message.unwrap();
        assert!(message.starts_with("Error processing image:"));

        let stats = agg.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(agg.cache_stats().await.memory_entries, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_fails() {
        let agg = aggregator(Providers::new(Arc::new(StubInspector::default()), geocoding()));
        let bad = AggregationRequest {
            max_results: 0,
            ..Default::default()
        };
        let result = agg.aggregate(&image(), &bad).await;
        assert!(!result.success);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn test_second_call_is_cache_hit() {
        let landmarks = StubLandmarks(Reply::Ok(vec![landmark("Big Ben", 0.9, 51.5007, -0.1246)]));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding())
                .with_landmarks(Arc::new(landmarks)),
        );
        let req = request(ProcessingMode::Fast);

        let first = agg.aggregate(&image(), &req).await;
        let second = agg.aggregate(&image(), &req).await;
        assert_eq!(first, second);

        let stats = agg.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 2);
        assert_eq!(stats.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_follows_current_request() {
        let landmarks = StubLandmarks(Reply::Ok(vec![
            landmark("Eiffel Tower", 0.95, 48.8584, 2.2945),
            landmark("Big Ben", 0.9, 51.5007, -0.1246),
            landmark("Colosseum", 0.85, 41.8902, 12.4922),
        ]));
        let reverse = Arc::new(StubReverse::new(Reply::Ok(Some(address("Somewhere", "Town")))));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding().with_reverse(reverse.clone()))
                .with_landmarks(Arc::new(landmarks)),
        );

        let narrow = AggregationRequest {
            max_results: 1,
            include_metadata: false,
            ..request(ProcessingMode::Fast)
        };
        let first = agg.aggregate(&image(), &narrow).await;
        assert_eq!(first.hypotheses.len(), 1);
        assert!(first.hypotheses[0].address.is_none());
        assert!(first.processing_metadata.is_none());
        assert_eq!(reverse.call_count(), 0);

        let wide = AggregationRequest {
            max_results: 5,
            include_address: true,
            include_metadata: true,
            ..request(ProcessingMode::Fast)
        };
        let second = agg.aggregate(&image(), &wide).await;
        assert_eq!(agg.stats().cache_hits, 1);
        assert_eq!(second.hypotheses.len(), 3);
        assert!(second
            .hypotheses
            .iter()
            .all(|h| h.address.as_deref() == Some("Somewhere")));
        assert_eq!(
            second.best_guess.unwrap().landmark_name.as_deref(),
            Some("Eiffel Tower")
        );
        assert_eq!(reverse.call_count(), 3);

        let meta = second.processing_metadata.unwrap();
        assert_eq!(meta.landmark_results_count, 3);
        assert!(meta.apis_used.contains(&api_label::REVERSE_GEOCODING.to_string()));
        assert!(second.image_metadata.is_some());
    }

    #[tokio::test]
    async fn test_mode_change_misses_cache() {
        let agg = aggregator(Providers::new(
            Arc::new(StubInspector::with_gps(1.0, 1.0)),
            geocoding(),
        ));
        agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;
        agg.aggregate(&image(), &request(ProcessingMode::Standard)).await;
        assert_eq!(agg.stats().cache_hits, 0);
        assert_eq!(agg.cache_stats().await.memory_entries, 2);
        assert_eq!(agg.clear_cache().await, 2);
    }

    #[tokio::test]
    async fn test_fast_mode_skips_text() {
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding())
                .with_text(Arc::new(StubText(Reply::Fail("should not run")))),
        );
        let result = agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;

        let meta = result.processing_metadata.unwrap();
        assert!(meta.error_messages.is_empty());
        assert_eq!(meta.text_results_count, 0);
        assert!(meta.apis_used.is_empty());
    }

    #[tokio::test]
    async fn test_text_geocoding_hypothesis() {
        let geocoder = StubGeocoder::named("stub").answer(
            "Louvre",
            vec![geocode_match(48.8606, 2.3376, 0.9, "Musée du Louvre, Paris")],
        );
        let agg = aggregator(
            Providers::new(
                Arc::new(StubInspector::default()),
                geocoding().with_primary(Arc::new(geocoder)),
            )
            .with_text(Arc::new(StubText(Reply::Ok(vec!["Musee du Louvre".to_string()])))),
        );
        let result = agg.aggregate(&image(), &request(ProcessingMode::Standard)).await;

        assert_eq!(result.hypotheses.len(), 1);
        let h = &result.hypotheses[0];
        assert_eq!(h.source, DataSource::OcrGeocoding);
        assert_relative_eq!(h.confidence, 0.63, epsilon = 1e-9);
        assert_eq!(h.address.as_deref(), Some("Musée du Louvre, Paris"));

        let meta = result.processing_metadata.unwrap();
        assert_eq!(meta.text_results_count, 1);
        assert_eq!(meta.geocoding_queries_count, 2);
        assert!(meta.apis_used.contains(&api_label::GEOCODING.to_string()));
    }

    #[tokio::test]
    async fn test_objects_recorded_without_hypotheses() {
        let objects = StubObjects(Reply::Ok(vec![
            object("Tower"),
            object("Person"),
            object("Bridge"),
            object("tower"),
        ]));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding())
                .with_objects(Arc::new(objects)),
        );
        let result = agg
            .aggregate(&image(), &request(ProcessingMode::Comprehensive))
            .await;

        assert!(result.hypotheses.is_empty());
        let meta = result.processing_metadata.unwrap();
        assert_eq!(meta.object_results_count, 4);
        assert_eq!(meta.location_objects, vec!["Tower".to_string(), "Bridge".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_landmark_discarded() {
        let landmarks = StubLandmarks(Reply::Ok(vec![
            landmark("Nowhere", 0.9, 95.0, 0.0),
            landmark("Colosseum", 0.9, 41.8902, 12.4922),
        ]));
        let agg = aggregator(
            Providers::new(Arc::new(StubInspector::default()), geocoding())
                .with_landmarks(Arc::new(landmarks)),
        );
        let result = agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;

        assert_eq!(result.hypotheses.len(), 1);
        assert_eq!(result.processing_metadata.unwrap().discarded_candidates, 1);
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let agg = Aggregator::new(
            Providers::new(Arc::new(StubInspector::with_gps(10.0, 10.0)), geocoding())
                .with_landmarks(Arc::new(StubLandmarks(Reply::Hang))),
            Arc::new(ResultCache::default()),
            Arc::new(RunStats::default()),
            Duration::from_millis(50),
        );
        let result = agg.aggregate(&image(), &request(ProcessingMode::Fast)).await;

        assert!(result.success);
        assert_eq!(result.hypotheses.len(), 1);
        let meta = result.processing_metadata.unwrap();
        assert!(meta.error_messages[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_address_enrichment() {
        let reverse = Arc::new(StubReverse::new(Reply::Ok(Some(address(
            "Champ de Mars, Paris",
            "Paris",
        )))));
        let agg = aggregator(Providers::new(
            Arc::new(StubInspector::with_gps(48.8584, 2.2945)),
            geocoding().with_reverse(reverse.clone()),
        ));
        let req = AggregationRequest::with_mode(ProcessingMode::Fast);
        let result = agg.aggregate(&image(), &req).await;

        let best = result.best_guess.unwrap();
        assert_eq!(best.address.as_deref(), Some("Champ de Mars, Paris"));
        assert_eq!(best.locality.as_deref(), Some("Paris"));
        assert_eq!(best.country_code.as_deref(), Some("fr"));
        assert_eq!(reverse.call_count(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_failure_leaves_hypothesis() {
        let reverse = Arc::new(StubReverse::new(Reply::Fail("rate limited")));
        let agg = aggregator(Providers::new(
            Arc::new(StubInspector::with_gps(48.8584, 2.2945)),
            geocoding().with_reverse(reverse),
        ));
        let req = AggregationRequest::with_mode(ProcessingMode::Fast);
        let result = agg.aggregate(&image(), &req).await;

        assert!(result.success);
        assert!(result.hypotheses[0].address.is_none());
        let meta = result.processing_metadata.unwrap();
        assert!(meta.error_messages[0].contains("rate limited"));
    }

    #[tokio::test]
    async fn test_metadata_can_be_omitted() {
        let agg = aggregator(Providers::new(
            Arc::new(StubInspector::with_gps(1.0, 1.0)),
            geocoding(),
        ));
        let req = AggregationRequest {
            include_metadata: false,
            ..request(ProcessingMode::Fast)
        };
        let result = agg.aggregate(&image(), &req).await;
        assert!(result.image_metadata.is_none());
        assert!(result.processing_metadata.is_none());
    }

    #[test]
    fn test_location_objects() {
        let found = location_objects(&[object("Train station"), object("Car"), object("Clock tower")]);
        assert_eq!(found, vec!["Train station".to_string(), "Clock tower".to_string()]);
    }
}
