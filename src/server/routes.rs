//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::aggregate::ProviderStatus;
use crate::cache::CacheStats;
use crate::config::defaults::MAX_BATCH_FILES;
use crate::config::Config;
use crate::error::Error;
use crate::hypothesis::{AggregationRequest, AggregationResult};
use crate::provider::ImageInput;
use crate::server::state::AppState;
use crate::stats::StatsSnapshot;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Room for multipart headers and boundaries on top of the file payloads
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .server
        .max_upload_bytes
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/locate", post(locate_handler))
        .route("/api/batch", post(batch_handler))
        .route("/api/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters for locate and batch requests
///
/// Anything omitted falls back to the `[defaults]` config section.
#[derive(Debug, Default, Deserialize)]
pub struct LocateParams {
    pub mode: Option<String>,
    pub min_confidence: Option<f64>,
    pub max_results: Option<usize>,
    pub include_metadata: Option<bool>,
    pub include_address: Option<bool>,
}

impl LocateParams {
    fn to_request(&self, config: &Config) -> Result<AggregationRequest, ApiError> {
        let mut request = config.default_request();
        if let Some(mode) = &self.mode {
            request.mode = mode
                .parse()
                .map_err(|e: String| ApiError::new(e, "INVALID_REQUEST"))?;
        }
        if let Some(min_confidence) = self.min_confidence {
            request.min_confidence = min_confidence;
        }
        if let Some(max_results) = self.max_results {
            request.max_results = max_results;
        }
        if let Some(include_metadata) = self.include_metadata {
            request.include_metadata = include_metadata;
        }
        if let Some(include_address) = self.include_address {
            request.include_address = include_address;
        }
        request.validate()?;
        Ok(request)
    }
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidImage(_) => "INVALID_IMAGE",
            Error::InvalidRequest(_) => "INVALID_REQUEST",
            Error::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        };
        ApiError::new(err.to_string(), code)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::new(format!("Invalid multipart body: {}", err), "INVALID_MULTIPART")
    }
}

/// A file taken from a multipart body
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Collect every `file`/`files` field; other fields are ignored
async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("file" | "files")) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        uploads.push(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Ok(uploads)
}

fn check_upload(config: &Config, upload: &Upload) -> Result<(), ApiError> {
    if upload.filename.is_empty() {
        return Err(ApiError::new("No file provided", "NO_FILE"));
    }
    if !config.is_allowed_file(&upload.filename) {
        return Err(ApiError::new(
            format!(
                "File type not allowed: {}. Allowed: {}",
                upload.filename,
                config.server.allowed_extensions.join(", ")
            ),
            "INVALID_FILE_TYPE",
        ));
    }
    if upload.bytes.len() > config.server.max_upload_bytes {
        return Err(ApiError::new(
            format!(
                "File too large. Max size: {} bytes",
                config.server.max_upload_bytes
            ),
            "FILE_TOO_LARGE",
        ));
    }
    Ok(())
}

/// Locate a single uploaded image
///
/// POST /api/locate
async fn locate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
    mut multipart: Multipart,
) -> Result<Json<AggregationResult>, ApiError> {
    let request = params.to_request(&state.config)?;

    let upload = read_uploads(&mut multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::new("No file provided", "NO_FILE"))?;
    check_upload(&state.config, &upload)?;

    let image = ImageInput::new(upload.filename, upload.bytes);
    Ok(Json(state.aggregator.aggregate(&image, &request).await))
}

/// Locate up to 10 images; invalid files are skipped
///
/// POST /api/batch
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
    mut multipart: Multipart,
) -> Result<Json<Vec<AggregationResult>>, ApiError> {
    let mut request = params.to_request(&state.config)?;
    request.include_metadata = true;
    request.include_address = true;

    let uploads = read_uploads(&mut multipart).await?;
    if uploads.len() > MAX_BATCH_FILES {
        return Err(ApiError::new(
            format!("Too many files. Maximum {} files allowed", MAX_BATCH_FILES),
            "TOO_MANY_FILES",
        ));
    }

    let images: Vec<ImageInput> = uploads
        .into_iter()
        .filter(|upload| match check_upload(&state.config, upload) {
            Ok(()) => true,
            Err(e) => {
                warn!(filename = %upload.filename, error = %e.error, "Skipping batch file");
                false
            }
        })
        .map(|upload| ImageInput::new(upload.filename, upload.bytes))
        .collect();

    let results = join_all(
        images
            .iter()
            .map(|image| state.aggregator.aggregate(image, &request)),
    )
    .await;

    Ok(Json(results))
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when landmark detection and forward geocoding are available
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
    pub providers: ProviderStatus,
}

/// Server health endpoint
///
/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = state.aggregator.provider_status();
    let healthy = providers.landmark_detection && !providers.forward_geocoders.is_empty();

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        timestamp: Utc::now(),
        providers,
    })
}

/// Run statistics
///
/// GET /api/stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.aggregator.stats())
}

/// Result cache occupancy
///
/// GET /api/cache/stats
async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.aggregator.cache_stats().await)
}

/// Clear cache response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub removed: usize,
    pub message: String,
}

/// Drop every cached result
///
/// DELETE /api/cache
async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> Json<ClearCacheResponse> {
    let removed = state.aggregator.clear_cache().await;
    Json(ClearCacheResponse {
        success: true,
        removed,
        message: "Cache cleared".to_string(),
    })
}
