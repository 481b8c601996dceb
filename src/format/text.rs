//! Human-readable text output formatter

use crate::config::Config;
use crate::coord::format_dms;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::hypothesis::AggregationResult;

/// Text formatter - outputs a human-readable summary
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format(&self, result: &AggregationResult, _config: &Config) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("photo-geolocate result ({})\n", result.request_id));
        if let Some(image) = &result.image_metadata {
            output.push_str(&format!(
                "Image: {} ({}x{} {}, {} bytes)\n",
                image.filename, image.width, image.height, image.format, image.size_bytes
            ));
        }

        if !result.success {
            output.push_str(&format!(
                "Failed: {}\n",
                result.error_message.as_deref().unwrap_or("unknown error")
            ));
            return Ok(output);
        }

        if result.hypotheses.is_empty() {
            output.push_str("\nNo location found.\n");
        } else {
            output.push_str("\nHypotheses:\n");
            for (i, h) in result.hypotheses.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. ({:.6}, {:.6}) {:.0}% [{}]\n",
                    i + 1,
                    h.latitude,
                    h.longitude,
                    h.confidence * 100.0,
                    h.source.label()
                ));
                output.push_str(&format!("     {}\n", format_dms(h.coords())));
                if let Some(name) = h.display_name() {
                    output.push_str(&format!("     {}\n", name));
                }
            }
        }

        if let Some(meta) = &result.processing_metadata {
            output.push_str(&format!("\nProcessed in {} ms\n", meta.processing_time_ms));
            if !meta.apis_used.is_empty() {
                output.push_str(&format!("APIs: {}\n", meta.apis_used.join(", ")));
            }
            if !meta.location_objects.is_empty() {
                output.push_str(&format!("Objects: {}\n", meta.location_objects.join(", ")));
            }
            for message in &meta.error_messages {
                output.push_str(&format!("Warning: {}\n", message));
            }
        }

        Ok(output)
    }
}
