//! Chart retrieval: resolve → pull → load → encode.

use charter_core::ChartMetadata;
use url::Url;

use crate::error::GetterError;
use crate::filename;
use crate::port::{ArchiveCodecPort, RegistryClientPort, TgzCodec};
use crate::reference::Reference;
use crate::resolver::{resolve, resolve_url};

/// A retrieved chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    /// Encoded chart archive.
    pub content: Vec<u8>,

    /// Reference the chart was pulled from.
    pub reference: Reference,

    /// Metadata of the loaded chart.
    pub metadata: ChartMetadata,
}

/// Retrieves charts from a registry client and encodes them for the caller.
///
/// The getter holds no state of its own: every call resolves the reference
/// and runs the full pull, load and encode chain. Caching and retries, if
/// any, belong to the registry client.
///
/// # Examples
///
/// ```no_run
/// use charter_registry::{CacheConfig, ChartCache, Getter, LocalRegistry};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = ChartCache::new(CacheConfig::default())?;
/// let getter = Getter::new(LocalRegistry::new("/var/lib/charter/registry", cache));
///
/// let retrieved = getter
///     .get("oci://localhost:5000/testrepo/testchart", Some("0.1.0"))
///     .await?;
/// println!("{} ({} bytes)", retrieved.reference, retrieved.content.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Getter<C, E = TgzCodec> {
    client: C,
    codec: E,
}

impl<C: RegistryClientPort> Getter<C> {
    /// Creates a getter that encodes charts with [`TgzCodec`].
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            client,
            codec: TgzCodec,
        }
    }
}

impl<C: RegistryClientPort, E: ArchiveCodecPort> Getter<C, E> {
    /// Creates a getter with a custom codec.
    #[must_use]
    pub const fn with_codec(client: C, codec: E) -> Self {
        Self { client, codec }
    }

    /// Returns the registry client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Resolves `locator` and `version`, then pulls, loads and encodes the chart.
    ///
    /// A tag already present in `locator` takes precedence over `version`.
    ///
    /// # Errors
    ///
    /// Returns the resolution error, or the failure of the first step that
    /// fails among pull, load and encode. No content is returned on failure.
    pub async fn get(
        &self,
        locator: &str,
        version: Option<&str>,
    ) -> Result<Retrieved, GetterError> {
        let reference = resolve(locator, version)?;
        self.retrieve(reference).await
    }

    /// Like [`get`](Self::get), for an already parsed URL.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_url(&self, url: &Url, version: Option<&str>) -> Result<Retrieved, GetterError> {
        let reference = resolve_url(url, version)?;
        self.retrieve(reference).await
    }

    /// Returns the output file name for `locator` and `version`.
    ///
    /// `version` is used as given, without tag precedence.
    #[must_use]
    pub fn filename(&self, locator: &Url, version: &str) -> String {
        filename::filename(locator, version)
    }

    async fn retrieve(&self, reference: Reference) -> Result<Retrieved, GetterError> {
        tracing::debug!(%reference, "Pulling chart");
        self.client
            .pull(&reference)
            .await
            .map_err(|source| GetterError::PullFailed {
                reference: reference.to_string(),
                source,
            })?;

        let chart = self
            .client
            .load(&reference)
            .await
            .map_err(|source| GetterError::LoadFailed {
                reference: reference.to_string(),
                source,
            })?;

        let mut content = Vec::new();
        self.codec
            .encode(&chart, &mut content)
            .map_err(|source| GetterError::EncodeFailed {
                reference: reference.to_string(),
                source,
            })?;

        tracing::debug!(%reference, bytes = content.len(), "Encoded chart");

        Ok(Retrieved {
            content,
            reference,
            metadata: chart.metadata,
        })
    }
}
