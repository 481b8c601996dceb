//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::Result;
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "defaults.mode")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    // Show path
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    // Reset config
    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        // No arguments: show all config
        (None, None) => {
            show_all_config(&config);
        }

        // Key only: show that value
        (Some(key), None) => {
            if !Config::available_keys().iter().any(|k| k == key) {
                eprintln!("Unknown config key: {}", key);
                eprintln!("\nAvailable keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                std::process::exit(1);
            }
            // Optional keys such as cache.dir may be unset
            println!("{}", config.get(key).unwrap_or_default());
        }

        // Key and value: set the value
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            if key.starts_with("api_keys.") {
                println!("{} updated", key);
            } else {
                println!("{} = {}", key, value);
            }
        }

        // Value without key: not valid
        (None, Some(_)) => {
            eprintln!("Error: Must specify a key to set a value");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn show_secret(name: &str, value: &str) {
    if value.is_empty() {
        println!("{} = \"\" # not configured", name);
    } else {
        println!("{} = \"***\" # configured", name);
    }
}

/// Display all configuration values
fn show_all_config(config: &Config) {
    println!("[defaults]");
    println!("mode = \"{}\"", config.defaults.mode);
    println!("min_confidence = {}", config.defaults.min_confidence);
    println!("max_results = {}", config.defaults.max_results);
    println!("include_metadata = {}", config.defaults.include_metadata);
    println!("include_address = {}", config.defaults.include_address);
    println!("format = \"{}\"", config.defaults.format);
    println!();

    println!("[server]");
    println!("host = \"{}\"", config.server.host);
    println!("port = {}", config.server.port);
    println!("max_upload_bytes = {}", config.server.max_upload_bytes);
    println!("allowed_extensions = {:?}", config.server.allowed_extensions);
    println!();

    println!("[cache]");
    println!("ttl_secs = {}", config.cache.ttl_secs);
    println!("durable = {}", config.cache.durable);
    match &config.cache.dir {
        Some(dir) => println!("dir = \"{}\"", dir.display()),
        None => println!("# dir = (platform cache directory)"),
    }
    println!("latency_window = {}", config.cache.latency_window);
    println!();

    println!("[providers]");
    println!("timeout_secs = {}", config.providers.timeout_secs);
    println!("landmark_min_score = {}", config.providers.landmark_min_score);
    println!("max_geocode_queries = {}", config.providers.max_geocode_queries);
    println!("nominatim = {}", config.providers.nominatim);
    println!();

    println!("[url]");
    println!("default = \"{}\"", config.url.default);
    println!();

    println!("[url.providers]");
    let mut providers: Vec<_> = config.url.providers.iter().collect();
    providers.sort();
    for (name, template) in providers {
        println!("{} = \"{}\"", name, template);
    }
    println!();

    println!("[api_keys]");
    show_secret("google_vision", &config.api_keys.google_vision);
    show_secret("opencage", &config.api_keys.opencage);
}
