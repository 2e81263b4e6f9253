//! Schema declarations read from JSON or YAML files.
//!
//! A schema file is a mapping of property name to definition, in the same
//! loose shape accepted by
//! [`Configuration::define_all`](config_schema_core::Configuration::define_all):
//!
//! ```yaml
//! port:
//!   format: port
//!   default: 8080
//!   env: PORT
//! db:
//!   doc: Database settings
//!   properties:
//!     url: url
//! ```

use std::io::BufReader;
use std::path::Path;

use config_schema_core::Configuration;
use serde_json::Value;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::yaml::YAML_EXTENSIONS;

/// Reads the definitions mapping from a schema file.
///
/// Files ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.
///
/// # Errors
///
/// Returns [`LoaderError::Io`] if the file cannot be opened,
/// [`LoaderError::Json`]/[`LoaderError::Yaml`] if it does not parse, and
/// [`LoaderError::InvalidSchema`] if the top level is not a mapping.
pub fn read_definitions(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| YAML_EXTENSIONS.iter().any(|y| ext.eq_ignore_ascii_case(y)));
    let defs: Value = if is_yaml {
        serde_yaml::from_reader(reader)?
    } else {
        serde_json::from_reader(reader)?
    };

    if !defs.is_object() {
        return Err(LoaderError::InvalidSchema(format!(
            "{}: top level must be a mapping of definitions",
            path.display()
        )));
    }
    debug!(path = %path.display(), yaml = is_yaml, "Read schema definitions");
    Ok(defs)
}

/// Declares every definition found in a schema file on the root.
pub fn define_from_file(config: &mut Configuration, path: impl AsRef<Path>) -> Result<()> {
    let defs = read_definitions(path)?;
    config.define_all(&defs)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config_schema_core::ErrorKind;
    use serde_json::json;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_json_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "schema.json", r#"{"port": {"format": "port", "default": 80}}"#);
        let defs = read_definitions(&path).unwrap();
        assert_eq!(defs, json!({"port": {"format": "port", "default": 80}}));
    }

    #[test]
    fn test_read_yaml_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "schema.yml",
            "level:\n  enum: [debug, info]\n  default: info\n",
        );
        let defs = read_definitions(&path).unwrap();
        assert_eq!(defs, json!({"level": {"enum": ["debug", "info"], "default": "info"}}));
    }

    #[test]
    fn test_non_mapping_is_invalid_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "schema.json", "[1, 2]");
        assert!(matches!(
            read_definitions(&path),
            Err(LoaderError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_definitions("/nonexistent/schema.json"),
            Err(LoaderError::Io(_))
        ));
    }

    #[test]
    fn test_define_from_file_propagates_schema_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "schema.json", r#"{"p": "notexists"}"#);
        let mut config = Configuration::empty();
        let err = define_from_file(&mut config, &path).unwrap_err();
        assert!(matches!(err, LoaderError::Config(ref e) if e.kind() == ErrorKind::Schema));
    }
}
