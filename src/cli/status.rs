//! Status command handler
//!
//! Shows configured providers and, if reachable, a running server's health.

use crate::config::Config;
use crate::error::Result;
use crate::server::routes::HealthResponse;
use crate::stats::StatsSnapshot;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// Server host (defaults to config)
    #[arg(long)]
    pub host: Option<String>,

    /// Server port (defaults to config)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    println!("photo-geolocate v{}", env!("CARGO_PKG_VERSION"));
    println!();

    show_providers(&config);
    println!();

    check_server_status(&config).await;
    Ok(())
}

fn configured(value: bool) -> &'static str {
    if value {
        "configured"
    } else {
        "not configured"
    }
}

/// Provider availability as seen from the local config
fn show_providers(config: &Config) {
    println!("Providers:");
    println!(
        "  Google Vision: {}",
        configured(!config.api_keys.google_vision.is_empty())
    );
    println!("  OpenCage: {}", configured(!config.api_keys.opencage.is_empty()));
    println!(
        "  Nominatim: {}",
        if config.providers.nominatim { "enabled" } else { "disabled" }
    );
    println!("  Timeout: {}s", config.providers.timeout_secs);
}

async fn fetch<T: serde::de::DeserializeOwned>(url: &str) -> std::result::Result<T, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.json().await
}

/// Query a running server's health and stats endpoints
async fn check_server_status(config: &Config) {
    let base = format!("http://{}", config.server_addr());

    let health: HealthResponse = match fetch(&format!("{}/api/health", base)).await {
        Ok(health) => health,
        Err(e) if e.is_status() => {
            println!("Server: ERROR ({})", e);
            return;
        }
        Err(_) => {
            println!("Server: NOT RUNNING on {}", config.server_addr());
            return;
        }
    };

    println!("Server: RUNNING on {} ({})", config.server_addr(), health.status);
    println!("  Version: {}", health.version);
    println!("  Uptime: {}s", health.uptime_secs);
    println!(
        "  Cache: {}",
        if health.providers.durable_cache { "memory + file" } else { "memory" }
    );

    match fetch::<StatsSnapshot>(&format!("{}/api/stats", base)).await {
        Ok(stats) => {
            println!(
                "  Requests: {} ({} ok, {} failed)",
                stats.total_requests, stats.successful_requests, stats.failed_requests
            );
            println!("  Success rate: {:.1}%", stats.success_rate * 100.0);
            println!("  Cache hit rate: {:.1}%", stats.cache_hit_rate * 100.0);
            println!("  Average time: {:.2} ms", stats.average_processing_time_ms);
        }
        Err(e) => println!("  Stats unavailable: {}", e),
    }
}
