//! Error types for the harvester.
//!
//! The taxonomy mirrors how failures are handled by the harvesting loop:
//! protocol errors are fatal to the current attempt, parse errors are
//! recoverable at prefix/set granularity, configuration errors are logged
//! and the harvest proceeds empty, persistence errors abort the whole run.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Call-sequencing violation: index out of range, exhausted cursor,
    /// missing response. Signals a caller fault, fatal to the attempt.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A response or catalog did not contain what a query expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// XML is not well-formed.
    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),

    /// No metadata prefixes declared or discoverable for an endpoint.
    #[error("no metadata prefixes declared for endpoint {0}")]
    Configuration(String),

    /// The overview store could not be read or written.
    #[error("overview store {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    /// Invalid endpoint URL.
    #[error("invalid endpoint URL: '{0}'. Expected http:// or https://")]
    InvalidEndpointUrl(String),

    /// Invalid date format.
    #[error("invalid date: '{0}'. Expected YYYY-MM-DD (e.g., 2026-01-01)")]
    InvalidDate(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// All retry attempts for a request failed.
    #[error("request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint configuration file could not be parsed.
    #[error("failed to parse endpoint configuration: {0}")]
    ConfigFile(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Whether the harvesting loop may log this failure and continue with
    /// the next prefix/set or target instead of aborting the endpoint.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Xml(_) | Self::Configuration(_)
        )
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
