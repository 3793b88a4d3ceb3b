//! Cache command implementation.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use super::RegistryOptions;

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache maintenance actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove expired entries and enforce the size limit
    Prune,

    /// Remove every cached chart
    Clear,

    /// Print the total size of cached archives
    Size,
}

/// Runs the cache command.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be opened or modified.
pub fn run(options: &RegistryOptions, args: &CacheArgs) -> Result<()> {
    let cache = options.open_cache()?;
    let dir = cache.config().dir.display().to_string();

    match args.action {
        CacheAction::Prune => {
            let stats = cache.prune().context("Failed to prune cache")?;
            info!(
                cache_dir = %dir,
                expired = stats.expired_removed,
                evicted_bytes = stats.size_evicted,
                "Pruned cache"
            );
            println!(
                "Pruned {dir}: {} expired entries removed, {} bytes evicted",
                stats.expired_removed, stats.size_evicted
            );
        }
        CacheAction::Clear => {
            cache.clear().context("Failed to clear cache")?;
            info!(cache_dir = %dir, "Cleared cache");
            println!("Cleared {dir}");
        }
        CacheAction::Size => {
            let size = cache.size().context("Failed to compute cache size")?;
            println!("{size} bytes in {dir}");
        }
    }

    Ok(())
}
