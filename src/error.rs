//! Error types for student-records-mcp.
//!
//! Store and dispatch errors live beside the code that raises them
//! ([`crate::store::StoreError`], [`crate::mcp::DispatchError`]); this module
//! holds the errors raised while assembling the runtime configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for environment variable {name}: '{value}'")]
    InvalidEnv {
        /// Name of the variable.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}
