//! Centralized constants for the photo-geolocate crate
//!
//! Values shared by several modules live here so the ranking rules, the
//! cache layout and the external endpoints stay in one place.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in kilometers (WGS84 approximation)
    pub const EARTH_RADIUS_KM: f64 = 6_371.0;

    /// Kilometers per degree of latitude, as used for bounding-box padding
    pub const KM_PER_DEGREE_LAT: f64 = 111.0;

    /// Decimal places kept when collapsing duplicate coordinates (~11 m)
    pub const DEDUP_DECIMAL_PLACES: i32 = 4;
}

/// Hypothesis ranking parameters
pub mod ranking {
    /// Two hypotheses closer than this agree spatially
    pub const AGREEMENT_RADIUS_KM: f64 = 50.0;

    /// Confidence added per agreeing neighbour
    pub const AGREEMENT_BOOST_STEP: f64 = 0.02;

    /// Upper bound on the total agreement boost
    pub const AGREEMENT_BOOST_CAP: f64 = 0.1;

    /// Largest `max_results` a request may ask for
    pub const MAX_RESULTS_LIMIT: usize = 20;
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// OpenCage forward geocoding API
    pub const OPENCAGE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";

    /// Google Cloud Vision annotate endpoint
    pub const VISION_ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

    /// User agent sent to every external service
    pub const USER_AGENT: &str = concat!("photo-geolocate/", env!("CARGO_PKG_VERSION"));
}

/// Cache settings
pub mod cache {
    /// Default result TTL in seconds (1 hour)
    pub const RESULT_TTL_SECS: u64 = 3600;

    /// Prefix of every result fingerprint
    pub const FINGERPRINT_PREFIX: &str = "geolocation";

    /// Hex characters of the digest kept in a fingerprint
    pub const FINGERPRINT_HEX_LEN: usize = 16;

    /// Durable writes between sweeps for expired entry files
    pub const DURABLE_PRUNE_INTERVAL: usize = 64;

    /// Directory (under the user cache dir) holding durable entries
    pub const RESULT_CACHE_DIR: &str = "results";
}
