//! Local chart cache.
//!
//! Pulled archives are stored per reference, next to a small JSON record of
//! their digest, so loads can happen without touching the registry store.
//! Entries expire after a TTL and the cache is kept under a size limit by
//! evicting the oldest archives.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use charter_core::archive::sha256_digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::reference::Reference;

const ARCHIVE_SUFFIX: &str = "tgz";
const MANIFEST_SUFFIX: &str = "manifest.json";

/// Configuration for the chart cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache directory (default: `<platform cache dir>/charter`).
    pub dir: PathBuf,

    /// Maximum cache size in bytes (default: 1GB).
    pub max_size: u64,

    /// Time-to-live for cache entries (default: 7 days).
    pub ttl: Duration,

    /// Verify archive digests on read.
    pub verify_checksums: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            max_size: 1024 * 1024 * 1024,
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            verify_checksums: true,
        }
    }
}

impl CacheConfig {
    /// Creates a new cache configuration with the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Sets the maximum cache size.
    #[must_use]
    pub const fn with_max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the TTL for cache entries.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enables or disables checksum verification.
    #[must_use]
    pub const fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

/// Default cache directory.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("charter")
}

/// Record stored next to each cached archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    reference: String,
    digest: String,
    size: u64,
    cached_at: DateTime<Utc>,
}

/// File-based chart cache with TTL expiry and oldest-first eviction.
///
/// Archives and records are replaced by renaming uniquely named temporary
/// files, so concurrent writers of the same entry never observe each
/// other's partial output.
#[derive(Debug, Clone)]
pub struct ChartCache {
    config: CacheConfig,
}

impl ChartCache {
    /// Creates a chart cache, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(config: CacheConfig) -> Result<Self, RegistryError> {
        let charts_dir = config.dir.join("charts");
        std::fs::create_dir_all(&charts_dir).map_err(RegistryError::io(&charts_dir))?;

        Ok(Self { config })
    }

    /// Returns the cache configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn entry_dir(&self, reference: &Reference) -> PathBuf {
        self.config
            .dir
            .join("charts")
            .join(reference.registry_dir())
            .join(reference.repository())
    }

    /// Returns the path of a cached archive.
    #[must_use]
    pub fn archive_path(&self, reference: &Reference) -> PathBuf {
        self.entry_dir(reference)
            .join(format!("{}.{ARCHIVE_SUFFIX}", reference.tag()))
    }

    /// Returns the path of a cached archive's record.
    #[must_use]
    pub fn manifest_path(&self, reference: &Reference) -> PathBuf {
        self.entry_dir(reference)
            .join(format!("{}.{MANIFEST_SUFFIX}", reference.tag()))
    }

    /// Retrieves a cached archive.
    ///
    /// Returns `None` if the reference is not cached, has expired, or fails
    /// checksum verification. Expired and corrupt entries are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache files cannot be read.
    pub fn get(&self, reference: &Reference) -> Result<Option<Vec<u8>>, RegistryError> {
        let archive_path = self.archive_path(reference);

        if !archive_path.exists() {
            return Ok(None);
        }

        if self.is_expired(&archive_path)? {
            tracing::debug!(%reference, "Cache entry expired, removing");
            self.invalidate(reference)?;
            return Ok(None);
        }

        let data = std::fs::read(&archive_path).map_err(RegistryError::io(&archive_path))?;

        if self.config.verify_checksums {
            let manifest_path = self.manifest_path(reference);
            let stored = if manifest_path.exists() {
                Some(Self::read_entry(&manifest_path)?.digest)
            } else {
                None
            };
            let actual = sha256_digest(&data);
            if stored.as_deref() != Some(actual.as_str()) {
                tracing::warn!(
                    %reference,
                    expected = stored.as_deref().unwrap_or("<missing>"),
                    %actual,
                    "Cache checksum mismatch, invalidating"
                );
                self.invalidate(reference)?;
                return Ok(None);
            }
        }

        tracing::debug!(%reference, "Cache hit");
        Ok(Some(data))
    }

    /// Stores an archive in the cache and returns its digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive or its record cannot be written.
    pub fn put(&self, reference: &Reference, data: &[u8]) -> Result<String, RegistryError> {
        let archive_path = self.archive_path(reference);
        let manifest_path = self.manifest_path(reference);

        if let Some(parent) = archive_path.parent() {
            std::fs::create_dir_all(parent).map_err(RegistryError::io(parent))?;
        }

        let digest = sha256_digest(data);
        let entry = CacheEntry {
            reference: reference.to_string(),
            digest: digest.clone(),
            size: data.len() as u64,
            cached_at: Utc::now(),
        };

        // The record lands first: an archive is never visible without one.
        write_atomic(&manifest_path, serde_json::to_string_pretty(&entry)?.as_bytes())?;
        write_atomic(&archive_path, data)?;

        tracing::debug!(%reference, %digest, "Cached chart");

        self.enforce_size_limit(Some(&archive_path))?;

        Ok(digest)
    }

    /// Removes a specific entry from the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if files cannot be deleted.
    pub fn invalidate(&self, reference: &Reference) -> Result<(), RegistryError> {
        for path in [self.archive_path(reference), self.manifest_path(reference)] {
            if path.exists() {
                std::fs::remove_file(&path).map_err(RegistryError::io(&path))?;
            }
        }
        Ok(())
    }

    /// Clears the entire cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be cleared.
    pub fn clear(&self) -> Result<(), RegistryError> {
        let path = self.config.dir.join("charts");
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(RegistryError::io(&path))?;
        }
        std::fs::create_dir_all(&path).map_err(RegistryError::io(&path))?;

        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Removes expired entries and enforces the size limit.
    ///
    /// # Errors
    ///
    /// Returns an error if cache files cannot be accessed or deleted.
    pub fn prune(&self) -> Result<PruneStats, RegistryError> {
        let mut stats = PruneStats::default();

        for path in self.archives() {
            if self.is_expired(&path)? {
                match Self::remove_entry(&path) {
                    Ok(_) => stats.expired_removed += 1,
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to remove expired cache entry");
                    }
                }
            }
        }

        stats.size_evicted = self.enforce_size_limit(None)?;

        Ok(stats)
    }

    /// Returns the total size of the cache in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be read.
    pub fn size(&self) -> Result<u64, RegistryError> {
        let path = self.config.dir.join("charts");
        if !path.exists() {
            return Ok(0);
        }

        let total = walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum();

        Ok(total)
    }

    /// Lists cached archive files.
    fn archives(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(self.config.dir.join("charts"))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == ARCHIVE_SUFFIX))
            .map(walkdir::DirEntry::into_path)
            .collect()
    }

    /// Removes an archive and its record, returning the bytes freed.
    fn remove_entry(archive_path: &Path) -> Result<u64, RegistryError> {
        let mut freed = 0;
        let manifest_path = archive_path.with_extension(MANIFEST_SUFFIX);
        for path in [archive_path, manifest_path.as_path()] {
            if let Ok(metadata) = std::fs::metadata(path) {
                std::fs::remove_file(path).map_err(RegistryError::io(path))?;
                freed += metadata.len();
            }
        }
        Ok(freed)
    }

    /// Checks if a cache entry has expired based on file modification time.
    fn is_expired(&self, path: &Path) -> Result<bool, RegistryError> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(RegistryError::io(path))?;

        let age = modified.elapsed().unwrap_or(Duration::ZERO);
        Ok(age > self.config.ttl)
    }

    fn read_entry(path: &Path) -> Result<CacheEntry, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(RegistryError::io(path))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Evicts the oldest archives until the cache is at 90% of its limit.
    ///
    /// `keep` is never evicted, even when it alone exceeds the limit.
    fn enforce_size_limit(&self, keep: Option<&Path>) -> Result<u64, RegistryError> {
        let current_size = self.size()?;
        if current_size <= self.config.max_size {
            return Ok(0);
        }

        let mut entries: Vec<(PathBuf, SystemTime)> = self
            .archives()
            .into_iter()
            .filter(|path| Some(path.as_path()) != keep)
            .filter_map(|path| {
                let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((path, modified))
            })
            .collect();

        entries.sort_by_key(|(_, time)| *time);

        let target_size = self.config.max_size * 9 / 10;
        let mut removed_size = 0u64;

        for (path, _) in entries {
            if current_size - removed_size <= target_size {
                break;
            }

            match Self::remove_entry(&path) {
                Ok(freed) => {
                    removed_size += freed;
                    tracing::debug!(?path, freed, "Evicted cache entry");
                }
                Err(e) => tracing::warn!(?path, error = %e, "Failed to evict cache entry"),
            }
        }

        Ok(removed_size)
    }
}

/// Replaces `path` with `data` through a uniquely named sibling temp file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), RegistryError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(RegistryError::io(dir))?;
    file.write_all(data).map_err(RegistryError::io(path))?;
    file.persist(path)
        .map_err(|e| RegistryError::io(path)(e.error))?;
    Ok(())
}

/// Statistics from a cache prune operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    /// Number of expired entries removed.
    pub expired_removed: u64,

    /// Bytes evicted due to size limit.
    pub size_evicted: u64,
}
