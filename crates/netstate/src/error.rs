//! Error types for state validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while gathering, comparing or persisting state.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not run a command against a device
    #[error("transport error on {host}: {message}")]
    Transport {
        /// Management address or name of the device
        host: String,
        /// Description of the failure reported by the transport
        message: String,
    },

    /// No comparator exists for the shape of a desired value
    #[error("unsupported comparison shape: {0}")]
    UnsupportedShape(String),

    /// Desired-state feature has no registered builder
    #[error("unknown desired-state feature '{0}'")]
    UnknownFeature(String),

    /// Feature variables did not have the expected structure
    #[error("invalid variables for feature '{feature}': {message}")]
    FeatureVars {
        /// Feature whose variables were rejected
        feature: String,
        /// What was wrong with them
        message: String,
    },

    /// Desired-state document did not have the expected sections
    #[error("invalid desired-state document: {0}")]
    Document(String),

    /// Formatter command pattern is not a valid regex
    #[error("invalid formatter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Report file or directory could not be read or written
    #[error("report IO error at {path}: {source}")]
    ReportIo {
        /// File or directory involved
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Existing report file is not a valid compliance report
    #[error("malformed report {path}: {source}")]
    ReportParse {
        /// Report file that failed to parse
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a transport error for a host.
    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Build a feature-variables error.
    pub fn feature_vars(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FeatureVars {
            feature: feature.into(),
            message: message.into(),
        }
    }
}

/// Result type for state validation operations.
pub type Result<T> = std::result::Result<T, Error>;
