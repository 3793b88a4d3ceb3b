//! Error types for chart retrieval and the local registry.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by registry client and archive codec implementations.
pub type PortError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by reference resolution and the retrieval pipeline.
///
/// Collaborator failures are wrapped with the reference they concern; the
/// underlying error stays reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum GetterError {
    /// The locator could not be parsed into a host and path.
    #[error("Malformed locator '{locator}': {reason}")]
    MalformedLocator {
        /// Locator as supplied by the caller.
        locator: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Host and path do not form a valid registry reference.
    #[error("Malformed reference '{reference}': {reason}")]
    MalformedReference {
        /// Reference text that was rejected.
        reference: String,
        /// Why validation failed.
        reason: String,
    },

    /// Neither the locator nor the caller supplied a version.
    #[error("No version given for '{locator}': add a tag to the locator or pass a version")]
    MissingVersion {
        /// Locator as supplied by the caller.
        locator: String,
    },

    /// The registry client failed to pull the reference.
    #[error("Failed to pull {reference}: {source}")]
    PullFailed {
        /// Resolved reference.
        reference: String,
        /// Underlying error.
        #[source]
        source: PortError,
    },

    /// The registry client failed to load the pulled chart.
    #[error("Failed to load {reference}: {source}")]
    LoadFailed {
        /// Resolved reference.
        reference: String,
        /// Underlying error.
        #[source]
        source: PortError,
    },

    /// The archive codec failed to encode the chart.
    #[error("Failed to encode {reference}: {source}")]
    EncodeFailed {
        /// Resolved reference.
        reference: String,
        /// Underlying error.
        #[source]
        source: PortError,
    },
}

/// Errors raised by the local registry and chart cache.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reference not present in the registry store.
    #[error("Chart not found: {reference}")]
    NotFound {
        /// Reference that was looked up.
        reference: String,
    },

    /// `load` was called before a successful `pull`.
    #[error("Chart {reference} has not been pulled into the cache")]
    NotPulled {
        /// Reference that was looked up.
        reference: String,
    },

    /// Stored archive does not match its recorded digest.
    #[error("Checksum mismatch for {reference}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Reference that was pulled.
        reference: String,
        /// Digest recorded in the manifest.
        expected: String,
        /// Digest of the stored archive.
        actual: String,
    },

    /// Manifest does not describe a chart archive.
    #[error("Invalid manifest for {reference}: {message}")]
    InvalidManifest {
        /// Reference whose manifest was read.
        reference: String,
        /// Error message.
        message: String,
    },

    /// Cache operation failed.
    #[error("Cache operation failed: {message}")]
    CacheError {
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Chart archive could not be encoded or decoded.
    #[error("Chart archive error: {0}")]
    Archive(#[from] charter_core::Error),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::IoError { path, source }
    }
}
