//! JSON output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::hypothesis::AggregationResult;

/// JSON formatter - outputs the full result as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON result"
    }

    fn format(&self, result: &AggregationResult, _config: &Config) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}
