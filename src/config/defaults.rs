//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default processing mode
pub const DEFAULT_MODE: &str = "standard";

/// Default confidence floor
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

/// Default number of hypotheses returned
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Attach metadata to results by default
pub const DEFAULT_INCLUDE_METADATA: bool = true;

/// Reverse geocode hypotheses by default
pub const DEFAULT_INCLUDE_ADDRESS: bool = true;

/// Default output format
pub const DEFAULT_FORMAT: &str = "json";

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Largest accepted upload (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Accepted image file extensions
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

/// Maximum number of files in one batch request
pub const MAX_BATCH_FILES: usize = 10;

/// Result cache time-to-live in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Number of latency samples retained for statistics
pub const DEFAULT_LATENCY_WINDOW: usize = 1000;

/// Per-provider call timeout in seconds
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Minimum landmark score accepted from the vision API
pub const DEFAULT_LANDMARK_MIN_SCORE: f64 = 0.5;

/// Maximum number of text-derived geocoding queries per image
pub const DEFAULT_MAX_GEOCODE_QUERIES: usize = 10;

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "google";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "photo-geolocate";
