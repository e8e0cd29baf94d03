//! Error types for the authprofile CLI

use std::path::PathBuf;
use thiserror::Error;

use authprofile::{CatalogError, LoaderError, VerifyError};

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file read error
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Profile catalog could not be built
    #[error("Unable to list profiles: {0}")]
    Catalog(#[from] CatalogError),

    /// Active selection could not be read
    #[error("Unable to read the active profile: {0}")]
    Loader(#[from] LoaderError),

    /// Verification could not run to completion
    #[error("Unable to verify configuration: {0}")]
    Verify(#[from] VerifyError),

    /// The active configuration does not match its profile
    #[error("Current configuration is not valid: {count} problem(s) found")]
    InvalidConfiguration { count: usize },

    /// Artifacts of a removed configuration are still on disk
    #[error("Leftovers of a previous configuration found: {count}")]
    LeftoversFound { count: usize },

    /// Link paths are already occupied
    #[error("{count} file(s) would be overwritten")]
    ConflictsFound { count: usize },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid value error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
