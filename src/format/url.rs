//! URL output formatter

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::OutputFormatter;
use crate::hypothesis::AggregationResult;

/// URL formatter - outputs a map URL for the best guess
pub struct UrlFormatter;

impl UrlFormatter {
    /// Format URL with optional provider override
    pub fn format_with_provider(
        &self,
        result: &AggregationResult,
        config: &Config,
        provider: Option<&str>,
    ) -> Result<String> {
        match &result.best_guess {
            Some(best) => config.format_url(provider, best.latitude, best.longitude),
            None => Err(Error::InvalidHypothesis(
                "No location found to link to".to_string(),
            )),
        }
    }
}

impl OutputFormatter for UrlFormatter {
    fn name(&self) -> &str {
        "url"
    }

    fn description(&self) -> &str {
        "Map URL for the best guess"
    }

    fn format(&self, result: &AggregationResult, config: &Config) -> Result<String> {
        self.format_with_provider(result, config, None)
    }
}
