//! YAML support for configuration files.

use config_schema_core::{Configuration, DecodeError};
use serde_json::Value;

use crate::error::Result;

/// Extensions served by [`register_yaml`].
pub const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Decodes YAML bytes into a JSON value.
///
/// Mappings must have string keys. An empty document decodes to `null`,
/// which the configuration rejects when loading a file.
///
/// # Examples
///
/// ```
/// use config_schema_loader::yaml_decoder;
/// use serde_json::json;
///
/// let value = yaml_decoder(b"port: 8080\nhosts:\n  - a.example\n").unwrap();
/// assert_eq!(value, json!({"port": 8080, "hosts": ["a.example"]}));
/// ```
pub fn yaml_decoder(bytes: &[u8]) -> std::result::Result<Value, DecodeError> {
    Ok(serde_yaml::from_slice(bytes)?)
}

/// Registers [`yaml_decoder`] for the `yaml` and `yml` extensions.
pub fn register_yaml(config: &mut Configuration) -> Result<()> {
    for ext in YAML_EXTENSIONS {
        config.add_parser(ext, yaml_decoder)?;
    }
    Ok(())
}
