//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod cache;
pub mod config;
pub mod locate;
pub mod serve;
pub mod status;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Locate where a photo was taken
#[derive(Parser)]
#[command(name = "photo-geolocate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Locate a single image
    Locate(locate::LocateArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Show or clear the result cache
    Cache(cache::CacheArgs),

    /// Show server and provider status
    Status(status::StatusArgs),
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Locate(args) => locate::run(args).await,
        Commands::Serve(args) => serve::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Cache(args) => cache::run(args).await,
        Commands::Status(args) => status::run(args).await,
    }
}
