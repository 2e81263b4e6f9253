//! Error types for configuration declaration, resolution and loading.
//!
//! Every fallible operation returns [`ConfigError`]. The variant tells the
//! caller which kind of mistake happened:
//!
//! - [`Argument`](ConfigError::Argument): a malformed argument was passed to
//!   a declaration or query call.
//! - [`Schema`](ConfigError::Schema): a structural conflict in a declaration.
//! - [`Validation`](ConfigError::Validation): a value failed its format or
//!   enum contract. This is the only kind that [`validate`] collects instead
//!   of returning.
//! - [`NotDefined`](ConfigError::NotDefined): the addressed property is not
//!   declared.
//! - [`Io`](ConfigError::Io): a file could not be read or decoded.
//!
//! [`validate`]: crate::Configuration::validate

use std::path::PathBuf;

use thiserror::Error;

/// Semantic category of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    Schema,
    Validation,
    NotDefined,
    Io,
}

/// A resolved value that failed its format or enum contract.
///
/// Carries the full dotted path of the offending property so that errors
/// collected into a flat report remain self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error for \"{path}\" property. {message}")]
pub struct ValidationError {
    /// Full dotted path of the property (e.g. `"server.port"`).
    pub path: String,
    /// Human-readable cause.
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the configuration engine.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Caller passed a malformed argument (bad name, wrong shape, empty key).
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Structural conflict in a schema declaration.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value failed its format or enum contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The addressed property is not declared.
    #[error("property \"{0}\" is not defined")]
    NotDefined(String),

    /// A configuration file could not be read or decoded.
    #[error("cannot load \"{}\": {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

impl ConfigError {
    /// Returns the semantic category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_schema_core::{ConfigError, ErrorKind};
    ///
    /// let err = ConfigError::NotDefined("server.port".into());
    /// assert_eq!(err.kind(), ErrorKind::NotDefined);
    /// assert_eq!(err.to_string(), "property \"server.port\" is not defined");
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotDefined(_) => ErrorKind::NotDefined,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Returns the dotted property path attached to a validation error.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Validation(e) => Some(&e.path),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_carries_path() {
        let err = ConfigError::from(ValidationError::new("sub.arg3", "bad value"));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.path(), Some("sub.arg3"));
        assert_eq!(
            err.to_string(),
            "Validation error for \"sub.arg3\" property. bad value"
        );
    }

    #[test]
    fn test_io_error_names_file() {
        let err = ConfigError::io("/etc/app.json", "no such file");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/etc/app.json"));
        assert_eq!(err.path(), None);
    }
}
