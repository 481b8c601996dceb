//! Cache command handler
//!
//! Inspects or clears the durable result cache.

use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::Result;
use clap::Args;

/// Cache command arguments
#[derive(Args)]
pub struct CacheArgs {
    /// Remove every cached result
    #[arg(long)]
    pub clear: bool,
}

/// Run the cache command
pub async fn run(args: CacheArgs) -> Result<()> {
    let config = Config::load()?;
    let cache = ResultCache::from_config(&config);

    if !cache.has_durable() {
        println!("Durable cache disabled; results are only cached inside a running server.");
        return Ok(());
    }

    if args.clear {
        let removed = cache.invalidate_all().await;
        println!("Removed {} cached result(s)", removed);
        return Ok(());
    }

    let stats = cache.stats().await;
    println!("Backend: {}", stats.durable_backend);
    if let Some(dir) = &stats.durable_dir {
        println!("Directory: {}", dir.display());
    }
    match stats.durable_entries {
        Some(n) => println!("Entries: {}", n),
        None => println!("Entries: unknown (directory unreadable)"),
    }
    println!("TTL: {}s", config.cache.ttl_secs);

    Ok(())
}
