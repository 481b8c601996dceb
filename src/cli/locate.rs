//! Locate command handler
//!
//! Runs one image through the aggregation pipeline and prints the result.

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter};
use crate::hypothesis::AggregationRequest;
use crate::provider::ImageInput;
use clap::Args;
use std::path::PathBuf;

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Image file to locate
    #[arg(required_unless_present = "list_formats")]
    pub image: Option<PathBuf>,

    /// Processing mode: fast, standard or comprehensive
    #[arg(long, short = 'm')]
    pub mode: Option<String>,

    /// Minimum confidence (0.0 - 1.0)
    #[arg(long, short = 'c')]
    pub min_confidence: Option<f64>,

    /// Maximum number of hypotheses
    #[arg(long, short = 'n')]
    pub max_results: Option<usize>,

    /// Skip reverse geocoding of results
    #[arg(long)]
    pub no_address: bool,

    /// Omit image and processing metadata
    #[arg(long)]
    pub no_metadata: bool,

    /// Output format
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

impl LocateArgs {
    /// Request from config defaults with command-line overrides applied
    fn request(&self, config: &Config) -> Result<AggregationRequest> {
        let mut request = config.default_request();
        if let Some(mode) = &self.mode {
            request.mode = mode.parse().map_err(Error::InvalidRequest)?;
        }
        if let Some(min_confidence) = self.min_confidence {
            request.min_confidence = min_confidence;
        }
        if let Some(max_results) = self.max_results {
            request.max_results = max_results;
        }
        if self.no_address {
            request.include_address = false;
        }
        if self.no_metadata {
            request.include_metadata = false;
        }
        request.validate()?;
        Ok(request)
    }
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = Config::load()?;
    let request = args.request(&config)?;

    let format = args.format.clone().unwrap_or(config.defaults.format.clone());
    let formatter = get_formatter(&format)
        .ok_or_else(|| Error::Config(format!("Unknown format: {}", format)))?;

    let path = args
        .image
        .as_deref()
        .ok_or_else(|| Error::InvalidRequest("No image specified".to_string()))?;
    let image = ImageInput::from_path(path)?;

    let aggregator = Aggregator::from_config(&config);
    let result = aggregator.aggregate(&image, &request).await;

    let output = formatter.format(&result, &config)?;
    if let Some(path) = &args.output {
        std::fs::write(path, &output)?;
        eprintln!("Output written to {}", path.display());
    } else {
        println!("{}", output);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Print available output formats
fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:6} - {}", format.name, format.description);
    }
}
