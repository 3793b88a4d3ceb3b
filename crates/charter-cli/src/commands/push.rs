//! Push command implementation.
//!
//! Stores a chart archive in the local registry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use charter_core::archive;
use charter_registry::{resolve, version_tag};

use super::RegistryOptions;

/// Arguments for the push command.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to the chart archive (.tgz)
    pub archive: PathBuf,

    /// Target locator (e.g., `oci://localhost:5000/testrepo/testchart`)
    pub locator: String,
}

/// Runs the push command and returns the stored digest.
///
/// Without a tag in the locator, the chart is stored under its own version,
/// with semver build metadata (`+`) written as `_`.
///
/// # Errors
///
/// Returns an error if:
/// - The archive cannot be read or is not a valid chart
/// - The locator cannot be resolved
/// - The registry store cannot be written
pub async fn execute(options: &RegistryOptions, args: &PushArgs) -> Result<String> {
    let data = std::fs::read(&args.archive)
        .with_context(|| format!("Failed to read {}", args.archive.display()))?;
    let chart = archive::from_bytes(&data)
        .with_context(|| format!("Invalid chart archive {}", args.archive.display()))?;

    let reference = resolve(&args.locator, Some(&version_tag(chart.version())))
        .with_context(|| format!("Invalid locator {}", args.locator))?;

    info!(%reference, chart = chart.name(), "Pushing chart");

    let registry = options.open_registry()?;
    let digest = registry
        .push(&reference, &chart)
        .await
        .with_context(|| format!("Failed to push {reference}"))?;

    println!("Pushed: {reference}");
    println!("  Digest:   {digest}");
    println!("  Registry: {}", registry.root().display());

    Ok(digest)
}
