//! # Charter Registry
//!
//! Chart retrieval from OCI-style registries.
//!
//! This crate turns an `oci://` locator plus an optional version into a
//! concrete registry reference, pulls the chart through a registry client,
//! and returns it as a gzip-compressed tar archive.
//!
//! ## Features
//!
//! - **Reference Resolution**: A tag embedded in the locator wins over the
//!   requested version; a locator with neither is rejected
//! - **Pluggable Clients**: Registry access sits behind [`RegistryClientPort`]
//! - **Local Registry**: Directory-backed store for offline and test use
//! - **Local Caching**: File-based chart cache with TTL and size eviction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use charter_registry::{CacheConfig, ChartCache, Getter, LocalRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ChartCache::new(CacheConfig::default())?;
//!     let registry = LocalRegistry::new("/var/lib/charter/registry", cache);
//!     let getter = Getter::new(registry);
//!
//!     // The embedded tag 0.1.0 takes precedence over "9.9.9"
//!     let chart = getter
//!         .get("oci://localhost:5000/testrepo/testchart:0.1.0", Some("9.9.9"))
//!         .await?;
//!     assert_eq!(chart.reference.tag(), "0.1.0");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Getter                              │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────────┐  │
//! │  │  Resolver   │  │ RegistryClient  │  │  ArchiveCodec   │  │
//! │  │ (Reference) │  │ (pull / load)   │  │   (tar+gzip)    │  │
//! │  └─────────────┘  └─────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               LocalRegistry + ChartCache                    │
//! │          (directory store, verified by digest)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod cache;
mod error;
mod filename;
mod getter;
mod local;
mod oci;
mod port;
mod provider;
mod reference;
mod resolver;

pub use cache::{default_cache_dir, CacheConfig, ChartCache, PruneStats};
pub use error::{GetterError, PortError, RegistryError};
pub use filename::{filename, filename_str};
pub use getter::{Getter, Retrieved};
pub use local::LocalRegistry;
pub use oci::{annotations, Descriptor, Manifest, MediaType};
pub use port::{ArchiveCodecPort, RegistryClientPort, TgzCodec};
pub use provider::{Provider, OCI_SCHEME};
pub use reference::{version_tag, Locator, Reference, DEFAULT_SCHEME};
pub use resolver::{resolve, resolve_url, TagSource};
