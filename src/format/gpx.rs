//! GPX output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::hypothesis::{AggregationResult, DataSource};

/// GPX formatter - one waypoint per hypothesis
pub struct GpxFormatter;

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl OutputFormatter for GpxFormatter {
    fn name(&self) -> &str {
        "gpx"
    }

    fn description(&self) -> &str {
        "GPX waypoint file"
    }

    fn format(&self, result: &AggregationResult, _config: &Config) -> Result<String> {
        let mut gpx = String::new();

        gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        gpx.push('\n');
        gpx.push_str(r#"<gpx version="1.1" creator="photo-geolocate">"#);
        gpx.push('\n');

        gpx.push_str("  <metadata>\n");
        let title = match &result.image_metadata {
            Some(image) => format!("photo-geolocate {}", escape_xml(&image.filename)),
            None => format!("photo-geolocate {}", result.request_id),
        };
        gpx.push_str(&format!("    <name>{}</name>\n", title));
        gpx.push_str(&format!("    <time>{}</time>\n", result.processed_at.to_rfc3339()));
        gpx.push_str("  </metadata>\n");

        for (i, h) in result.hypotheses.iter().enumerate() {
            gpx.push_str(&format!(r#"  <wpt lat="{}" lon="{}">"#, h.latitude, h.longitude));
            gpx.push('\n');

            let name = h
                .display_name()
                .map(escape_xml)
                .unwrap_or_else(|| format!("Hypothesis {}", i + 1));
            gpx.push_str(&format!("    <name>{}</name>\n", name));
            gpx.push_str(&format!(
                "    <desc>{} confidence {:.2}</desc>\n",
                h.source.label(),
                h.confidence
            ));

            let symbol = match h.source {
                DataSource::ExifGps => "camera",
                DataSource::LandmarkDetection => "attraction",
                DataSource::OcrGeocoding => "text",
                DataSource::ReverseGeocoding => "pin",
            };
            gpx.push_str(&format!("    <sym>{}</sym>\n", symbol));

            gpx.push_str("  </wpt>\n");
        }

        gpx.push_str("</gpx>\n");
        Ok(gpx)
    }
}
