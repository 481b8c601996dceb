//! Server shared state
//!
//! Holds configuration and shared resources for the HTTP server.

use crate::aggregate::Aggregator;
use crate::config::Config;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    /// Aggregation pipeline, cache and statistics
    pub aggregator: Arc<Aggregator>,

    started: Instant,
}

impl AppState {
    /// Create state with providers built from the configuration
    pub fn new(config: Config) -> Self {
        let aggregator = Arc::new(Aggregator::from_config(&config));
        Self::with_aggregator(config, aggregator)
    }

    /// Create state around an existing aggregator
    pub fn with_aggregator(config: Config, aggregator: Arc<Aggregator>) -> Self {
        Self {
            config,
            aggregator,
            started: Instant::now(),
        }
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
