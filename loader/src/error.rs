//! Error types for file-oriented loading.
//!
//! Wraps the failure modes of the loader helpers: I/O, JSON and YAML
//! decoding, errors raised by the configuration engine itself, and schema
//! files with the wrong shape.

use config_schema_core::ConfigError;
use thiserror::Error;

/// Errors that can occur while reading schema files or applying a loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration engine rejected a declaration or a file.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A schema file whose top level is not a mapping of definitions.
    #[error("invalid schema file: {0}")]
    InvalidSchema(String),
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
