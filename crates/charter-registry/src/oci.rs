//! OCI manifest types used to describe stored charts.
//!
//! The local registry writes one image manifest per reference, with a single
//! chart-content layer pointing at the stored archive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// OCI media types for chart artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// Chart content layer media type.
    pub const CHART_CONTENT: &'static str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the chart content media type.
    #[must_use]
    pub fn chart_content() -> Self {
        Self::new(Self::CHART_CONTENT)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// Well-known annotation keys.
pub mod annotations {
    /// File name of the layer content.
    pub const TITLE: &str = "org.opencontainers.image.title";
    /// Version of the packaged chart.
    pub const VERSION: &str = "org.opencontainers.image.version";
    /// Creation timestamp (RFC 3339).
    pub const CREATED: &str = "org.opencontainers.image.created";
}

/// OCI content descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content (`sha256:<hex>`).
    pub digest: String,

    /// Size in bytes of the content.
    pub size: u64,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(media_type: MediaType, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type,
            digest: digest.into(),
            size,
            annotations: BTreeMap::new(),
        }
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// OCI image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    pub media_type: MediaType,

    /// Layers that make up the artifact.
    pub layers: Vec<Descriptor>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// Creates a manifest holding a single chart layer.
    #[must_use]
    pub fn for_chart(chart_layer: Descriptor) -> Self {
        Self {
            schema_version: 2,
            media_type: MediaType::new(MediaType::OCI_MANIFEST),
            layers: vec![chart_layer],
            annotations: BTreeMap::new(),
        }
    }

    /// Adds an annotation to the manifest.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Returns the chart content layer, if present.
    #[must_use]
    pub fn chart_layer(&self) -> Option<&Descriptor> {
        self.layers
            .iter()
            .find(|d| d.media_type.as_str() == MediaType::CHART_CONTENT)
    }
}
