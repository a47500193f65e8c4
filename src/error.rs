//! Error types for pagepack
//!
//! This module provides the error taxonomy used by every stage of an export job:
//! - Request validation (identifiers, job names, formats)
//! - Discovery (model resolution, repository access, page ceiling, empty results)
//! - Packaging (missing sources, conversion, archive writing)
//!
//! Every error that ends a job is rendered through `Display` into the one-line
//! failure report stored next to the job's archive.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pagepack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pagepack
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "BATCH_PATH")
        key: Option<String>,
    },

    /// Identifier does not carry the required prefix
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The object's relationship document does not name exactly one model
    #[error("could not resolve model of {identifier}: found {found} model relations")]
    ModelResolution {
        /// Identifier whose model was requested
        identifier: String,
        /// Number of model relations found
        found: usize,
    },

    /// The repository answered, but not with a usable document
    #[error("repository error for {identifier}: {reason}")]
    Repository {
        /// Identifier the request was made for
        identifier: String,
        /// What went wrong
        reason: String,
    },

    /// Transport failure talking to the repository
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed XML document
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Image-server URL could not be mapped onto a storage mount
    #[error("no storage mount for image path {path}")]
    UnroutablePath {
        /// URL path that could not be routed
        path: String,
    },

    /// Discovery finished but found more pages than permitted
    #[error("Page count ({count}) over limit ({ceiling}).")]
    PageCeilingExceeded {
        /// Pages resolved when discovery ended
        count: usize,
        /// Configured page ceiling
        ceiling: usize,
    },

    /// The identifier list held no identifiers
    #[error("No identifier set in the list.")]
    EmptyRequest,

    /// Discovery found neither pages nor sub-objects
    #[error("No images found.")]
    EmptyResult,

    /// Discovery did not finish within the configured time
    #[error("Discovery did not finish within {0:?}.")]
    DiscoveryTimeout(std::time::Duration),

    /// Archive creation failed
    #[error("packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// A job with this name exists in some state already
    #[error("job {0} already exists")]
    JobExists(String),

    /// Job name is empty or would escape the job directory
    #[error("invalid job name: {0:?}")]
    InvalidJobName(String),

    /// Requested target format is not one of the supported formats
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),

    /// A background task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Worker(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool execution failed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing converter binary, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Errors raised while writing a job's archive
#[derive(Debug, Error)]
pub enum PackagingError {
    /// A resolved page path does not exist on disk
    #[error("source file does not exist: {path}")]
    SourceMissing {
        /// The missing page path
        path: PathBuf,
    },

    /// The converter could not produce the requested format
    #[error("conversion of {path} failed: {reason}")]
    ConversionFailed {
        /// Page that failed to convert
        path: PathBuf,
        /// Converter's reason
        reason: String,
    },

    /// Writing the zip container failed
    #[error("could not write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The blocking archive writer task died
    #[error("archive writer task failed: {0}")]
    WriterTask(String),
}

impl Error {
    /// Shorthand for a configuration error bound to a key
    pub(crate) fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_report_names_count() {
        let err = Error::PageCeilingExceeded {
            count: 2417,
            ceiling: 2000,
        };
        assert_eq!(err.to_string(), "Page count (2417) over limit (2000).");
    }

    #[test]
    fn test_empty_result_report() {
        assert_eq!(Error::EmptyResult.to_string(), "No images found.");
    }

    #[test]
    fn test_packaging_error_wraps_source() {
        let err: Error = PackagingError::SourceMissing {
            path: PathBuf::from("/mnt/mzk/a.jp2"),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.starts_with("packaging error:"), "got: {msg}");
        assert!(msg.contains("/mnt/mzk/a.jp2"), "got: {msg}");
    }

    #[test]
    fn test_config_helper_sets_key() {
        match Error::config("missing", "BATCH_PATH") {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("BATCH_PATH"));
                assert_eq!(message, "missing");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
