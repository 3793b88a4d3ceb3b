//! Error types for Charter core operations.
//!
//! This module defines the error types used throughout the `charter-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, encoding or decoding charts.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing archive bytes failed.
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `Chart.yaml` could not be parsed or rendered.
    #[error("Invalid Chart.yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The archive layout is not a valid chart archive.
    #[error("Invalid chart archive: {reason}")]
    InvalidArchive {
        /// Reason the archive was rejected.
        reason: String,
    },

    /// Chart metadata is incomplete or inconsistent.
    #[error("Invalid chart: {reason}")]
    InvalidChart {
        /// Reason the chart was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_archive() {
        let err = Error::InvalidArchive {
            reason: "Chart.yaml not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid chart archive: Chart.yaml not found"
        );
    }

    #[test]
    fn test_error_display_invalid_chart() {
        let err = Error::InvalidChart {
            reason: "name is required".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid chart: name is required");
    }

    #[test]
    fn test_error_from_io() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
