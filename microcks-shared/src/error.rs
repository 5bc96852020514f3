//! Error types for the Microcks CLI crates

use thiserror::Error;

/// Errors produced by the configuration store, the API clients and the
/// watch manager.
#[derive(Error, Debug)]
pub enum MicrocksError {
    /// A named context, server or user is not present in the configuration
    #[error("{0}")]
    NotFound(String),

    /// The configuration or a command argument is malformed
    #[error("{0}")]
    Validation(String),

    /// A Microcks or Keycloak API call returned a non-success status
    #[error("{0}")]
    Upstream(String),

    /// Filesystem error while reading or writing configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Local environment problem such as a missing home directory
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MicrocksError {
    /// True when the error denotes a missing configuration record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MicrocksError::NotFound(_))
    }
}

/// Result type alias for Microcks CLI operations
pub type Result<T> = std::result::Result<T, MicrocksError>;
