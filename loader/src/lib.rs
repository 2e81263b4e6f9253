//! File-oriented helpers for `config-schema-core`.
//!
//! - [`yaml_decoder`] / [`register_yaml`]: YAML configuration files
//!   (`.yaml`, `.yml`).
//! - [`read_definitions`] / [`define_from_file`]: schema declarations kept
//!   in a JSON or YAML file.
//! - [`ConfigLoader`]: an ordered chain of required files, optional files
//!   and directories applied to a [`Configuration`](config_schema_core::Configuration).
//!
//! # Quick start
//!
//! ```no_run
//! use config_schema_core::Configuration;
//! use config_schema_loader::{ConfigLoader, define_from_file, register_yaml};
//!
//! let mut config = Configuration::new();
//! register_yaml(&mut config).unwrap();
//! define_from_file(&mut config, "schema.yaml").unwrap();
//!
//! ConfigLoader::new()
//!     .file("config/default.yaml")
//!     .optional_file("config/local.yaml")
//!     .apply(&mut config)
//!     .unwrap();
//!
//! let port = config.get("port").unwrap();
//! ```

mod error;
mod loader;
mod schema_file;
mod yaml;

pub use error::{LoaderError, Result};
pub use loader::{ConfigLoader, ConfigSource};
pub use schema_file::{define_from_file, read_definitions};
pub use yaml::{YAML_EXTENSIONS, register_yaml, yaml_decoder};
