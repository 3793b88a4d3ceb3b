//! # Charter Core
//!
//! Chart model and archive codec shared by the Charter crates.
//!
//! - [`Chart`] - chart metadata plus packaged files
//! - [`archive`] - deterministic gzip-compressed tar encoding of charts
//!
//! ## Example
//!
//! ```rust
//! use charter_core::{archive, Chart};
//!
//! let chart = Chart::builder("testchart")
//!     .version("0.1.0")
//!     .add_file("values.yaml", "replicas: 1\n")
//!     .build()?;
//!
//! let bytes = archive::to_bytes(&chart)?;
//! let loaded = archive::from_bytes(&bytes)?;
//! assert_eq!(loaded, chart);
//! # Ok::<(), charter_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod chart;
pub mod error;


pub use chart::{Chart, ChartBuilder, ChartMetadata, ARCHIVE_EXTENSION};
pub use error::{Error, Result};
