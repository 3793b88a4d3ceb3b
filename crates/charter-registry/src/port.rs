//! Capability interfaces consumed by the [`Getter`](crate::Getter).
//!
//! Registry transport, authentication and caching live behind
//! [`RegistryClientPort`]; archive serialization lives behind
//! [`ArchiveCodecPort`]. Both can be replaced with in-memory fakes.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use charter_core::{archive, Chart};

use crate::error::PortError;
use crate::reference::Reference;

/// A registry client able to pull a reference and load the pulled chart.
#[async_trait]
pub trait RegistryClientPort: Send + Sync {
    /// Makes the chart for `reference` available locally.
    async fn pull(&self, reference: &Reference) -> Result<(), PortError>;

    /// Loads a chart previously made available by [`pull`](Self::pull).
    async fn load(&self, reference: &Reference) -> Result<Chart, PortError>;
}

#[async_trait]
impl<T: RegistryClientPort + ?Sized> RegistryClientPort for Arc<T> {
    async fn pull(&self, reference: &Reference) -> Result<(), PortError> {
        (**self).pull(reference).await
    }

    async fn load(&self, reference: &Reference) -> Result<Chart, PortError> {
        (**self).load(reference).await
    }
}

/// Serializes a chart to a byte stream.
pub trait ArchiveCodecPort: Send + Sync {
    /// Writes the encoded form of `chart` to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be encoded or `out` fails.
    fn encode(&self, chart: &Chart, out: &mut dyn Write) -> Result<(), PortError>;
}

/// Gzip-compressed tar codec, the standard chart archive format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TgzCodec;

impl ArchiveCodecPort for TgzCodec {
    fn encode(&self, chart: &Chart, out: &mut dyn Write) -> Result<(), PortError> {
        archive::write_archive(chart, out).map_err(Into::into)
    }
}
