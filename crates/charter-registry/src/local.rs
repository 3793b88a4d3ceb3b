//! Filesystem-backed registry client.
//!
//! The store mirrors registry references as directories:
//!
//! ```text
//! <root>/
//!   <host>/
//!     <repository>/
//!       <tag>/
//!         manifest.json
//!         chart.tgz
//! ```
//!
//! `pull` verifies the stored archive against its manifest and copies it
//! into the [`ChartCache`]; `load` decodes the cached archive.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use charter_core::archive::{self, sha256_digest};
use charter_core::Chart;

use crate::cache::{write_atomic, ChartCache};
use crate::error::{PortError, RegistryError};
use crate::oci::{annotations, Descriptor, Manifest, MediaType};
use crate::port::RegistryClientPort;
use crate::reference::Reference;

const MANIFEST_FILE: &str = "manifest.json";
const ARCHIVE_FILE: &str = "chart.tgz";

/// A registry client over a local directory store and chart cache.
#[derive(Debug)]
pub struct LocalRegistry {
    root: PathBuf,
    cache: ChartCache,
}

impl LocalRegistry {
    /// Creates a registry rooted at `root`, caching pulls in `cache`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, cache: ChartCache) -> Self {
        Self {
            root: root.into(),
            cache,
        }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the chart cache.
    #[must_use]
    pub const fn cache(&self) -> &ChartCache {
        &self.cache
    }

    fn reference_dir(&self, reference: &Reference) -> PathBuf {
        self.root
            .join(reference.registry_dir())
            .join(reference.repository())
            .join(reference.tag())
    }

    /// Encodes `chart` and stores it under `reference`, replacing any
    /// previous content. Returns the archive digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be encoded or written.
    pub async fn push(&self, reference: &Reference, chart: &Chart) -> Result<String, RegistryError> {
        let data = archive::to_bytes(chart)?;
        let digest = sha256_digest(&data);

        let layer = Descriptor::new(MediaType::chart_content(), &digest, data.len() as u64)
            .with_annotation(annotations::TITLE, chart.file_name());
        let manifest = Manifest::for_chart(layer)
            .with_annotation(annotations::VERSION, chart.version())
            .with_annotation(annotations::CREATED, chrono::Utc::now().to_rfc3339());

        if reference.name() != chart.name() {
            tracing::warn!(
                %reference,
                chart = chart.name(),
                "Repository name differs from chart name"
            );
        }

        let dir = self.reference_dir(reference);
        let manifest = serde_json::to_vec_pretty(&manifest)?;
        blocking(move || {
            std::fs::create_dir_all(&dir).map_err(RegistryError::io(&dir))?;
            // Archive before manifest: a visible manifest always has its blob.
            write_atomic(&dir.join(ARCHIVE_FILE), &data)?;
            write_atomic(&dir.join(MANIFEST_FILE), &manifest)
        })
        .await?;

        tracing::info!(%reference, %digest, "Pushed chart");
        Ok(digest)
    }

    /// Verifies the stored chart for `reference` and places it in the cache.
    ///
    /// A cached archive whose digest matches the stored manifest is reused.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if nothing is stored under `reference`
    /// - [`RegistryError::InvalidManifest`] if the manifest has no chart layer
    /// - [`RegistryError::ChecksumMismatch`] if the stored archive is corrupt
    pub async fn pull_chart(&self, reference: &Reference) -> Result<(), RegistryError> {
        let manifest = self.read_manifest(reference).await?;
        let layer = manifest
            .chart_layer()
            .ok_or_else(|| RegistryError::InvalidManifest {
                reference: reference.to_string(),
                message: "manifest does not contain a chart layer".to_string(),
            })?;

        let cache = self.cache.clone();
        let key = reference.clone();
        if let Some(cached) = blocking(move || cache.get(&key)).await? {
            if sha256_digest(&cached) == layer.digest {
                tracing::debug!(%reference, "Chart already cached");
                return Ok(());
            }
        }

        let archive_path = self.reference_dir(reference).join(ARCHIVE_FILE);
        let data = match tokio::fs::read(&archive_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RegistryError::NotFound {
                    reference: reference.to_string(),
                });
            }
            Err(e) => return Err(RegistryError::io(&archive_path)(e)),
        };

        if data.len() as u64 != layer.size {
            return Err(RegistryError::InvalidManifest {
                reference: reference.to_string(),
                message: format!(
                    "chart size mismatch: expected {}, got {}",
                    layer.size,
                    data.len()
                ),
            });
        }

        let actual = sha256_digest(&data);
        if actual != layer.digest {
            return Err(RegistryError::ChecksumMismatch {
                reference: reference.to_string(),
                expected: layer.digest.clone(),
                actual,
            });
        }

        let cache = self.cache.clone();
        let key = reference.clone();
        blocking(move || cache.put(&key, &data)).await?;
        tracing::info!(%reference, digest = %layer.digest, "Pulled chart");
        Ok(())
    }

    /// Decodes the cached chart for `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotPulled`] if the chart is not cached, or an
    /// archive error if the cached bytes are not a valid chart.
    pub async fn load_chart(&self, reference: &Reference) -> Result<Chart, RegistryError> {
        let cache = self.cache.clone();
        let key = reference.clone();
        blocking(move || {
            let data = cache.get(&key)?.ok_or_else(|| RegistryError::NotPulled {
                reference: key.to_string(),
            })?;
            Ok(archive::from_bytes(&data)?)
        })
        .await
    }

    /// Lists the tags stored for a repository, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository directory cannot be read.
    pub async fn tags(&self, registry: &str, repository: &str) -> Result<Vec<String>, RegistryError> {
        let dir = self.root.join(registry.replace(':', "_")).join(repository);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::io(&dir)(e)),
        };

        let mut tags = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(RegistryError::io(&dir))? {
            let is_tag = tokio::fs::try_exists(entry.path().join(MANIFEST_FILE))
                .await
                .unwrap_or(false);
            if is_tag {
                if let Some(tag) = entry.file_name().to_str() {
                    tags.push(tag.to_string());
                }
            }
        }

        tags.sort();
        Ok(tags)
    }

    async fn read_manifest(&self, reference: &Reference) -> Result<Manifest, RegistryError> {
        let path = self.reference_dir(reference).join(MANIFEST_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RegistryError::NotFound {
                reference: reference.to_string(),
            }),
            Err(e) => Err(RegistryError::io(&path)(e)),
        }
    }
}

/// Runs synchronous filesystem work off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T, RegistryError>
where
    F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RegistryError::CacheError {
            message: format!("filesystem task failed: {e}"),
        })?
}

#[async_trait]
impl RegistryClientPort for LocalRegistry {
    async fn pull(&self, reference: &Reference) -> Result<(), PortError> {
        self.pull_chart(reference).await.map_err(Into::into)
    }

    async fn load(&self, reference: &Reference) -> Result<Chart, PortError> {
        self.load_chart(reference).await.map_err(Into::into)
    }
}
