//! Pull command implementation.
//!
//! Retrieves a chart from the local registry and writes it as a `.tgz`
//! archive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use charter_registry::{filename_str, version_tag, Getter};

use super::RegistryOptions;

/// Arguments for the pull command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Chart locator (e.g., `oci://localhost:5000/testrepo/testchart:0.1.0`)
    pub locator: String,

    /// Version to pull when the locator carries no tag (`+` is read as `_`)
    #[arg(short, long)]
    pub version: Option<String>,

    /// Directory to write the archive into
    #[arg(short, long, default_value = ".")]
    pub destination: PathBuf,
}

/// Runs the pull command.
///
/// # Errors
///
/// Returns an error if:
/// - The locator cannot be resolved
/// - The chart cannot be pulled or encoded
/// - The archive cannot be written
pub async fn execute(options: &RegistryOptions, args: &PullArgs) -> Result<PathBuf> {
    info!(
        locator = %args.locator,
        version = args.version.as_deref().unwrap_or(""),
        "Pulling chart"
    );

    let getter = Getter::new(options.open_registry()?);
    let tag = args.version.as_deref().map(version_tag);
    let retrieved = getter
        .get(&args.locator, tag.as_deref())
        .await
        .with_context(|| format!("Failed to pull {}", args.locator))?;

    let version = args
        .version
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| retrieved.reference.tag());
    let output_path = output_path(&args.destination, &args.locator, version);

    std::fs::create_dir_all(&args.destination).with_context(|| {
        format!("Failed to create {}", args.destination.display())
    })?;
    std::fs::write(&output_path, &retrieved.content)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("Pulled: {}", retrieved.reference);
    println!("  Chart:   {}", retrieved.metadata.name);
    println!("  Version: {}", retrieved.metadata.version);
    println!("  Output:  {}", output_path.display());

    Ok(output_path)
}

/// Archive path inside `destination` for `locator` at `version`.
fn output_path(destination: &Path, locator: &str, version: &str) -> PathBuf {
    destination.join(filename_str(locator, version))
}
