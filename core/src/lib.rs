//! Hierarchical configuration schema and value resolution.
//!
//! This crate models an application's configuration as a tree of named
//! properties:
//!
//! - [`Configuration`]: the root. Owns the schema tree, the loaded value
//!   store, the custom [`FormatRegistry`] and the file decoder table.
//! - [`Node`] / [`NodeMut`]: views of one node of the tree, addressed by
//!   dotted path (`"server.tls"`).
//! - [`LeafDefinition`] / [`NodeDefinition`] / [`Definition`]: typed
//!   declarations; [`Definition::from_value`] accepts the loose JSON shape.
//! - [`Format`]: a named type contract (`validate` + `parse`). The
//!   [`BuiltinFormat`] table covers `int`, `port`, `url`, `duration`,
//!   `bytesize` and more; [`CustomFormat`] builds one from closures.
//!
//! A leaf's value is resolved from, in order: the override assigned with
//! `set`, the argument named by its `arg`, the environment variable named by
//! its `env`, the loaded value store, and finally its default. The raw value
//! is then validated and parsed by the leaf's format (or checked against its
//! enum). [`Configuration::validate`] audits only the loaded values and
//! collects failures into a [`ValidationReport`].
//!
//! # Example
//!
//! ```
//! use config_schema_core::*;
//! use serde_json::json;
//!
//! let sources = Sources::new().with_arg("port", "7000");
//! let mut config = Configuration::with_sources(sources);
//! config.define_all(&json!({
//!     "port": {"format": "port", "default": 8080, "arg": "port", "env": "PORT"},
//!     "hosts": {"format": "[url]", "default": ["localhost"]},
//!     "cache": {
//!         "doc": "Cache settings",
//!         "properties": {
//!             "ttl": {"format": "duration", "default": "5 min"},
//!             "size": {"format": "bytesize", "default": "64mb"}
//!         }
//!     }
//! }))?;
//! config.load(json!({"port": 9000, "cache": {"ttl": "30 s"}}))?;
//!
//! assert_eq!(config.get("port")?, Some(json!(7000)));
//! assert_eq!(config.source("port")?, Some(ValueSource::Arg));
//! assert_eq!(config.get("cache.ttl")?, Some(json!(30_000)));
//! assert_eq!(config.get("cache.size")?, Some(json!(67_108_864)));
//!
//! let cache = config.get_child("cache").unwrap();
//! assert_eq!(cache.doc(), Some("Cache settings"));
//! assert!(config.validate(ValidateOptions::default())?.is_empty());
//! # Ok::<(), ConfigError>(())
//! ```

mod builtin;
mod config;
mod decoder;
mod error;
mod format;
mod merge;
mod node;
mod resolve;
mod sources;
mod types;
pub mod validate;

pub use builtin::BuiltinFormat;
pub use config::Configuration;
pub use decoder::{DecodeError, Decoder, decoder, json_decoder};
pub use error::{ConfigError, ErrorKind, Result, ValidationError};
pub use format::{CustomFormat, Format, FormatRegistry, FormatSpec};
pub use merge::deep_merge;
pub use node::{Node, NodeId, NodeMut};
pub use resolve::ValueSource;
pub use sources::Sources;
pub use types::{Definition, LeafDefinition, LeafKind, NodeDefinition};
pub use validate::{ReportEntry, ValidateOptions, ValidationReport};
