//! Chart model.
//!
//! This module defines the [`Chart`] structure that represents a packaged,
//! versioned artifact as stored in and retrieved from a registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archive::CHART_METADATA_FILE;
use crate::{Error, Result};

/// Default `apiVersion` written into new charts.
pub const DEFAULT_API_VERSION: &str = "v2";

/// File extension of encoded chart archives.
pub const ARCHIVE_EXTENSION: &str = "tgz";

/// A chart: metadata plus the files it packages.
///
/// Files are keyed by their path relative to the chart root and kept sorted,
/// so encoding the same chart twice yields the same archive.
///
/// # Examples
///
/// ```rust
/// use charter_core::Chart;
///
/// let chart = Chart::builder("testchart")
///     .version("0.1.0")
///     .add_file("values.yaml", "replicas: 1\n")
///     .build()
///     .unwrap();
///
/// assert_eq!(chart.name(), "testchart");
/// assert_eq!(chart.file_name(), "testchart-0.1.0.tgz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    /// Parsed `Chart.yaml`.
    pub metadata: ChartMetadata,

    /// Packaged files (relative path -> contents).
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Contents of `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version.
    pub api_version: String,

    /// Chart name.
    pub name: String,

    /// Chart version.
    pub version: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Version of the application packaged by the chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Search keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ChartMetadata {
    /// Checks that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChart`] if `apiVersion`, `name` or `version` is
    /// empty, or if the name contains a path separator.
    pub fn validate(&self) -> Result<()> {
        if self.api_version.trim().is_empty() {
            return Err(Error::InvalidChart {
                reason: "apiVersion is required".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidChart {
                reason: "name is required".to_string(),
            });
        }
        if self.name.contains(['/', '\\']) {
            return Err(Error::InvalidChart {
                reason: format!("name '{}' must not contain path separators", self.name),
            });
        }
        if matches!(self.name.as_str(), "." | "..") {
            return Err(Error::InvalidChart {
                reason: format!("name '{}' is not a valid directory name", self.name),
            });
        }
        if self.version.trim().is_empty() {
            return Err(Error::InvalidChart {
                reason: "version is required".to_string(),
            });
        }
        Ok(())
    }
}

impl Chart {
    /// Creates a new builder for constructing a [`Chart`].
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ChartBuilder {
        ChartBuilder::new(name)
    }

    /// Returns the chart name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the chart version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Returns the contents of a packaged file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Returns the canonical archive file name for this chart.
    ///
    /// Format: `<name>-<version>.tgz`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.{ARCHIVE_EXTENSION}",
            self.metadata.name, self.metadata.version
        )
    }
}

/// Checks that `path` names a packaged file: `/`-separated, relative, with no
/// empty, `.` or `..` segments, and not the reserved `Chart.yaml`.
///
/// # Errors
///
/// Returns [`Error::InvalidChart`] if the path is rejected.
pub fn check_file_path(path: &str) -> Result<()> {
    if path == CHART_METADATA_FILE {
        return Err(Error::InvalidChart {
            reason: format!("file path '{path}' is reserved for chart metadata"),
        });
    }

    let canonical = !path.is_empty()
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
    if canonical {
        Ok(())
    } else {
        Err(Error::InvalidChart {
            reason: format!("file path '{path}' must be relative and stay inside the chart"),
        })
    }
}

/// Builder for constructing [`Chart`] instances.
#[derive(Debug)]
pub struct ChartBuilder {
    metadata: ChartMetadata,
    files: BTreeMap<String, Vec<u8>>,
}

impl ChartBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ChartMetadata {
                api_version: DEFAULT_API_VERSION.to_string(),
                name: name.into(),
                version: String::new(),
                description: None,
                app_version: None,
                keywords: Vec::new(),
            },
            files: BTreeMap::new(),
        }
    }

    /// Sets the chart version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = version.into();
        self
    }

    /// Sets the chart API version.
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.metadata.api_version = api_version.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Sets the application version.
    #[must_use]
    pub fn app_version(mut self, app_version: impl Into<String>) -> Self {
        self.metadata.app_version = Some(app_version.into());
        self
    }

    /// Adds a keyword.
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.metadata.keywords.push(keyword.into());
        self
    }

    /// Adds a packaged file.
    #[must_use]
    pub fn add_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Builds the chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata fails [`ChartMetadata::validate`] or
    /// a file path fails [`check_file_path`].
    pub fn build(self) -> Result<Chart> {
        self.metadata.validate()?;
        for path in self.files.keys() {
            check_file_path(path)?;
        }
        Ok(Chart {
            metadata: self.metadata,
            files: self.files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_builder_basic() {
        let chart = Chart::builder("testchart").version("0.1.0").build().unwrap();

        assert_eq!(chart.name(), "testchart");
        assert_eq!(chart.version(), "0.1.0");
        assert_eq!(chart.metadata.api_version, DEFAULT_API_VERSION);
        assert!(chart.files.is_empty());
    }

    #[test]
    fn test_chart_builder_with_files() {
        let chart = Chart::builder("testchart")
            .version("1.2.3")
            .add_file("values.yaml", "replicas: 1\n")
            .add_file("templates/deployment.yaml", "kind: Deployment\n")
            .build()
            .unwrap();

        assert_eq!(chart.files.len(), 2);
        assert_eq!(chart.file("values.yaml"), Some(&b"replicas: 1\n"[..]));
        assert!(chart.file("missing.yaml").is_none());
    }

    #[test]
    fn test_chart_builder_missing_version() {
        let result = Chart::builder("testchart").build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("version is required"));
    }

    #[test]
    fn test_chart_name_with_separator_rejected() {
        let result = Chart::builder("repo/testchart").version("0.1.0").build();
        assert!(matches!(result, Err(Error::InvalidChart { .. })));
    }

    #[test]
    fn test_chart_dot_names_rejected() {
        for name in [".", ".."] {
            let result = Chart::builder(name).version("0.1.0").build();
            assert!(matches!(result, Err(Error::InvalidChart { .. })), "{name}");
        }
    }

    #[test]
    fn test_reserved_metadata_file_rejected() {
        let result = Chart::builder("testchart")
            .version("0.1.0")
            .add_file("Chart.yaml", "apiVersion: v2\nname: other\nversion: 9.9.9\n")
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("reserved for chart metadata"));
    }

    #[test]
    fn test_non_canonical_file_paths_rejected() {
        for path in ["", "/etc/passwd", "../outside.yaml", "./values.yaml", "templates//a.yaml", "templates/"] {
            assert!(check_file_path(path).is_err(), "{path:?}");
        }
        assert!(check_file_path("templates/Chart.yaml").is_ok());
    }

    #[test]
    fn test_chart_file_name() {
        let chart = Chart::builder("testchart").version("1.2.3").build().unwrap();
        assert_eq!(chart.file_name(), "testchart-1.2.3.tgz");
    }

    #[test]
    fn test_metadata_yaml_keys() {
        let chart = Chart::builder("testchart")
            .version("0.1.0")
            .app_version("2.0")
            .build()
            .unwrap();

        let yaml = serde_yaml::to_string(&chart.metadata).unwrap();
        assert!(yaml.contains("apiVersion: v2"));
        assert!(yaml.contains("appVersion:"));
        assert!(!yaml.contains("description"));
        assert!(!yaml.contains("keywords"));
    }
}
