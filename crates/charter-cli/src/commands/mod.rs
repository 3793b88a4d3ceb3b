//! CLI commands and argument parsing.

pub mod cache;
pub mod pull;
pub mod push;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use charter_registry::{default_cache_dir, CacheConfig, ChartCache, LocalRegistry};

/// Charter - chart retrieval from OCI-style registries
#[derive(Parser)]
#[command(name = "charter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub registry: RegistryOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pull a chart and write it as a .tgz archive
    Pull(pull::PullArgs),

    /// Push a chart archive into the local registry
    Push(push::PushArgs),

    /// Manage the chart cache
    Cache(cache::CacheArgs),

    /// Print version information
    Version,
}

/// Registry and cache locations shared by all commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Root directory of the local registry store
    #[arg(long, global = true, env = "CHARTER_REGISTRY_ROOT")]
    pub registry_root: Option<PathBuf>,

    /// Chart cache directory
    #[arg(long, global = true, env = "CHARTER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Cache entry time-to-live in seconds
    #[arg(long, global = true)]
    pub cache_ttl_secs: Option<u64>,

    /// Maximum cache size in bytes
    #[arg(long, global = true)]
    pub cache_max_bytes: Option<u64>,
}

impl RegistryOptions {
    /// Returns the registry root, defaulting to the platform data directory.
    pub fn registry_root(&self) -> PathBuf {
        self.registry_root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("charter")
                .join("registry")
        })
    }

    /// Builds the cache configuration from the options.
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new(self.cache_dir.clone().unwrap_or_else(default_cache_dir));
        if let Some(secs) = self.cache_ttl_secs {
            config = config.with_ttl(Duration::from_secs(secs));
        }
        if let Some(bytes) = self.cache_max_bytes {
            config = config.with_max_size(bytes);
        }
        config
    }

    /// Opens the chart cache.
    pub fn open_cache(&self) -> Result<ChartCache> {
        ChartCache::new(self.cache_config()).context("Failed to open chart cache")
    }

    /// Opens the local registry.
    pub fn open_registry(&self) -> Result<LocalRegistry> {
        Ok(LocalRegistry::new(self.registry_root(), self.open_cache()?))
    }
}
