//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/photo-geolocate/config.toml

pub mod defaults;

use crate::error::{Error, Result};
use crate::hypothesis::{AggregationRequest, ProcessingMode};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default request parameters
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Signal provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// URL generation settings
    #[serde(default)]
    pub url: UrlConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
}

/// Default request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Processing mode: fast, standard or comprehensive
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_true")]
    pub include_metadata: bool,

    #[serde(default = "default_true")]
    pub include_address: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// File extensions accepted for upload
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Persist results to disk in addition to memory
    #[serde(default = "default_true")]
    pub durable: bool,

    /// Override for the durable cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Number of latency samples kept for statistics
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
}

/// Signal provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Per-call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Minimum landmark score accepted from the vision API
    #[serde(default = "default_landmark_min_score")]
    pub landmark_min_score: f64,

    /// Cap on text-derived geocoding queries per image
    #[serde(default = "default_max_geocode_queries")]
    pub max_geocode_queries: usize,

    /// Use OpenStreetMap Nominatim (no key required)
    #[serde(default = "default_true")]
    pub nominatim: bool,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeysConfig {
    /// Google Cloud Vision API key
    #[serde(default)]
    pub google_vision: String,

    /// OpenCage geocoder API key
    #[serde(default)]
    pub opencage: String,
}

// Default value functions for serde
fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}
fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_true() -> bool {
    true
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_latency_window() -> usize {
    DEFAULT_LATENCY_WINDOW
}
fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}
fn default_landmark_min_score() -> f64 {
    DEFAULT_LANDMARK_MIN_SCORE
}
fn default_max_geocode_queries() -> usize {
    DEFAULT_MAX_GEOCODE_QUERIES
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://www.google.com/maps/@{lat},{lng},15z".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/#map=18/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?ll={lat},{lng}".to_string(),
    );
    providers
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            min_confidence: default_min_confidence(),
            max_results: default_max_results(),
            include_metadata: DEFAULT_INCLUDE_METADATA,
            include_address: DEFAULT_INCLUDE_ADDRESS,
            format: default_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            durable: true,
            dir: None,
            latency_window: default_latency_window(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout(),
            landmark_min_score: default_landmark_min_score(),
            max_geocode_queries: default_max_geocode_queries(),
            nominatim: true,
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["defaults", "mode"] => Some(self.defaults.mode.clone()),
            ["defaults", "min_confidence"] => Some(self.defaults.min_confidence.to_string()),
            ["defaults", "max_results"] => Some(self.defaults.max_results.to_string()),
            ["defaults", "include_metadata"] => Some(self.defaults.include_metadata.to_string()),
            ["defaults", "include_address"] => Some(self.defaults.include_address.to_string()),
            ["defaults", "format"] => Some(self.defaults.format.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "max_upload_bytes"] => Some(self.server.max_upload_bytes.to_string()),
            ["server", "allowed_extensions"] => Some(self.server.allowed_extensions.join(",")),

            ["cache", "ttl_secs"] => Some(self.cache.ttl_secs.to_string()),
            ["cache", "durable"] => Some(self.cache.durable.to_string()),
            ["cache", "dir"] => self.cache.dir.as_ref().map(|d| d.display().to_string()),
            ["cache", "latency_window"] => Some(self.cache.latency_window.to_string()),

            ["providers", "timeout_secs"] => Some(self.providers.timeout_secs.to_string()),
            ["providers", "landmark_min_score"] => {
                Some(self.providers.landmark_min_score.to_string())
            }
            ["providers", "max_geocode_queries"] => {
                Some(self.providers.max_geocode_queries.to_string())
            }
            ["providers", "nominatim"] => Some(self.providers.nominatim.to_string()),

            ["url", "default"] => Some(self.url.default.clone()),

            ["api_keys", "google_vision"] => Some(self.api_keys.google_vision.clone()),
            ["api_keys", "opencage"] => Some(self.api_keys.opencage.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["defaults", "mode"] => {
                let mode: ProcessingMode = value.parse().map_err(Error::Config)?;
                self.defaults.mode = mode.to_string();
            }
            ["defaults", "min_confidence"] => {
                let v: f64 = parse_value(key, value)?;
                if !(0.0..=1.0).contains(&v) {
                    return Err(Error::Config(format!(
                        "min_confidence must be between 0 and 1, got {}",
                        value
                    )));
                }
                self.defaults.min_confidence = v;
            }
            ["defaults", "max_results"] => {
                self.defaults.max_results = parse_value(key, value)?;
            }
            ["defaults", "include_metadata"] => {
                self.defaults.include_metadata = parse_value(key, value)?;
            }
            ["defaults", "include_address"] => {
                self.defaults.include_address = parse_value(key, value)?;
            }
            ["defaults", "format"] => {
                self.defaults.format = value.to_string();
            }

            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "port"] => {
                self.server.port = parse_value(key, value)?;
            }
            ["server", "max_upload_bytes"] => {
                self.server.max_upload_bytes = parse_value(key, value)?;
            }
            ["server", "allowed_extensions"] => {
                self.server.allowed_extensions = value
                    .split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
            }

            ["cache", "ttl_secs"] => {
                self.cache.ttl_secs = parse_value(key, value)?;
            }
            ["cache", "durable"] => {
                self.cache.durable = parse_value(key, value)?;
            }
            ["cache", "dir"] => {
                self.cache.dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            ["cache", "latency_window"] => {
                self.cache.latency_window = parse_value(key, value)?;
            }

            ["providers", "timeout_secs"] => {
                self.providers.timeout_secs = parse_value(key, value)?;
            }
            ["providers", "landmark_min_score"] => {
                self.providers.landmark_min_score = parse_value(key, value)?;
            }
            ["providers", "max_geocode_queries"] => {
                self.providers.max_geocode_queries = parse_value(key, value)?;
            }
            ["providers", "nominatim"] => {
                self.providers.nominatim = parse_value(key, value)?;
            }

            ["url", "default"] => {
                self.url.default = value.to_string();
            }

            ["api_keys", "google_vision"] => {
                self.api_keys.google_vision = value.to_string();
            }
            ["api_keys", "opencage"] => {
                self.api_keys.opencage = value.to_string();
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "defaults.mode",
            "defaults.min_confidence",
            "defaults.max_results",
            "defaults.include_metadata",
            "defaults.include_address",
            "defaults.format",
            "server.host",
            "server.port",
            "server.max_upload_bytes",
            "server.allowed_extensions",
            "cache.ttl_secs",
            "cache.durable",
            "cache.dir",
            "cache.latency_window",
            "providers.timeout_secs",
            "providers.landmark_min_score",
            "providers.max_geocode_queries",
            "providers.nominatim",
            "url.default",
            "api_keys.google_vision",
            "api_keys.opencage",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, lat: f64, lng: f64) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self
            .url
            .providers
            .get(provider_name)
            .ok_or_else(|| Error::Config(format!("Unknown URL provider: {}", provider_name)))?;

        Ok(template
            .replace("{lat}", &lat.to_string())
            .replace("{lng}", &lng.to_string()))
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build a request from the configured defaults
    ///
    /// An unrecognised mode string falls back to the default mode.
    pub fn default_request(&self) -> AggregationRequest {
        AggregationRequest {
            mode: self.defaults.mode.parse().unwrap_or_default(),
            min_confidence: self.defaults.min_confidence,
            max_results: self.defaults.max_results,
            include_metadata: self.defaults.include_metadata,
            include_address: self.defaults.include_address,
        }
    }

    /// Directory for the durable result cache
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        dirs::cache_dir()
            .map(|p| p.join(APP_DIR_NAME).join(crate::constants::cache::RESULT_CACHE_DIR))
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))
    }

    /// Result cache entry lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Per-provider call timeout
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.timeout_secs)
    }

    /// Whether an upload filename has an accepted extension
    pub fn is_allowed_file(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.server.allowed_extensions.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn with_temp_config<F: FnOnce()>(f: F) {
        let temp_dir = TempDir::new().unwrap();
        env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        f();
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.defaults.mode, "standard");
        assert_eq!(config.defaults.min_confidence, 0.6);
        assert_eq!(config.defaults.max_results, 5);
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.providers.timeout_secs, 10);
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        assert_eq!(config.get("defaults.mode"), Some("standard".to_string()));

        config.set("defaults.mode", "FAST").unwrap();
        assert_eq!(config.get("defaults.mode"), Some("fast".to_string()));

        config.set("defaults.min_confidence", "0.3").unwrap();
        assert_eq!(config.defaults.min_confidence, 0.3);

        config.set("api_keys.opencage", "abc").unwrap();
        assert_eq!(config.get("api_keys.opencage"), Some("abc".to_string()));
    }

    #[test]
    fn test_get_invalid_key() {
        let config = Config::default();
        assert_eq!(config.get("invalid.key"), None);
        assert_eq!(config.get("cache.dir"), None);
    }

    #[test]
    fn test_set_invalid_key() {
        let mut config = Config::default();
        assert!(config.set("invalid.key", "value").is_err());
    }

    #[test]
    fn test_set_invalid_value() {
        let mut config = Config::default();
        assert!(config.set("server.port", "not_a_number").is_err());
        assert!(config.set("defaults.mode", "turbo").is_err());
        assert!(config.set("defaults.min_confidence", "1.5").is_err());
    }

    #[test]
    fn test_set_allowed_extensions() {
        let mut config = Config::default();
        config.set("server.allowed_extensions", "JPG, .png").unwrap();
        assert_eq!(config.server.allowed_extensions, vec!["jpg", "png"]);
        assert!(config.is_allowed_file("photo.PNG"));
        assert!(!config.is_allowed_file("photo.webp"));
    }

    #[test]
    fn test_is_allowed_file() {
        let config = Config::default();
        assert!(config.is_allowed_file("holiday.jpeg"));
        assert!(config.is_allowed_file("scan.TIFF"));
        assert!(!config.is_allowed_file("notes.txt"));
        assert!(!config.is_allowed_file("no_extension"));
    }

    #[test]
    fn test_format_url() {
        let config = Config::default();

        let url = config.format_url(Some("google"), 40.7128, -74.0060).unwrap();
        assert_eq!(url, "https://www.google.com/maps/@40.7128,-74.006,15z");

        let url = config
            .format_url(Some("openstreetmap"), 40.7128, -74.0060)
            .unwrap();
        assert_eq!(url, "https://www.openstreetmap.org/#map=18/40.7128/-74.006");
    }

    #[test]
    fn test_format_url_unknown_provider() {
        let config = Config::default();
        assert!(config.format_url(Some("unknown"), 40.7128, -74.0060).is_err());
    }

    #[test]
    fn test_default_request() {
        let mut config = Config::default();
        config.defaults.mode = "comprehensive".to_string();
        config.defaults.max_results = 3;

        let req = config.default_request();
        assert_eq!(req.mode, ProcessingMode::Comprehensive);
        assert_eq!(req.max_results, 3);

        config.defaults.mode = "garbage".to_string();
        assert_eq!(config.default_request().mode, ProcessingMode::Standard);
    }

    #[test]
    fn test_cache_dir_override() {
        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/tmp/pg-cache"));
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/pg-cache"));
    }

    #[test]
    fn test_save_and_load() {
        with_temp_config(|| {
            let mut config = Config::default();
            config.defaults.mode = "fast".to_string();
            config.cache.ttl_secs = 60;
            config.save().unwrap();

            let loaded = Config::load().unwrap();
            assert_eq!(loaded.defaults.mode, "fast");
            assert_eq!(loaded.cache.ttl_secs, 60);
        });
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.server.host, "127.0.0.1");
        assert_eq!(loaded.defaults.max_results, 5);
        assert!(loaded.providers.nominatim);
    }

    #[test]
    fn test_serialization_format() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();

        assert!(toml.contains("[defaults]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[providers]"));
        assert!(toml.contains("[url.providers]"));
    }

    #[test]
    fn test_server_addr() {
        let config = Config::default();
        assert_eq!(config.server_addr(), "127.0.0.1:7878");
    }
}
