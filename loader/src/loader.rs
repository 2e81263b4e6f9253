//! Layered file loading with a builder.
//!
//! [`ConfigLoader`] records an ordered list of sources and applies them to
//! a [`Configuration`] in that order, so later files win on conflicting
//! keys. Three kinds of source are supported:
//!
//! - a required file, which must exist,
//! - an optional file, skipped when absent,
//! - a directory, whose files are loaded in lexical file-name order when a
//!   decoder is registered for their extension.
//!
//! ```no_run
//! use config_schema_core::Configuration;
//! use config_schema_loader::{ConfigLoader, register_yaml};
//!
//! let mut config = Configuration::new();
//! register_yaml(&mut config).unwrap();
//!
//! let loaded = ConfigLoader::new()
//!     .file("config/default.json")
//!     .dir("config/conf.d")
//!     .optional_file("config/local.yaml")
//!     .apply(&mut config)
//!     .unwrap();
//! println!("loaded {} files", loaded.len());
//! ```

use std::path::{Path, PathBuf};

use config_schema_core::Configuration;
use tracing::{debug, info, warn};

use crate::error::Result;

/// One entry of a [`ConfigLoader`] chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file that must exist and decode.
    File(PathBuf),
    /// A file loaded only if it exists.
    OptionalFile(PathBuf),
    /// Every loadable file in a directory.
    Dir(PathBuf),
}

/// Builder for an ordered chain of configuration files.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Creates a loader with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(ConfigSource::File(path.into()));
        self
    }

    /// Adds a file that is skipped when it does not exist.
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(ConfigSource::OptionalFile(path.into()));
        self
    }

    /// Adds a directory of configuration files.
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(ConfigSource::Dir(path.into()));
        self
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Loads every source into `config`, in declaration order.
    ///
    /// Returns the files that were actually loaded.
    ///
    /// # Errors
    ///
    /// Stops at the first required file, optional file or directory entry
    /// that fails to load, returning
    /// [`LoaderError::Config`](crate::LoaderError::Config). Files loaded
    /// before the failure stay merged.
    pub fn apply(&self, config: &mut Configuration) -> Result<Vec<PathBuf>> {
        let mut loaded = Vec::new();

        for source in &self.sources {
            match source {
                ConfigSource::File(path) => {
                    config.load_file(path)?;
                    loaded.push(path.clone());
                }
                ConfigSource::OptionalFile(path) => {
                    if !path.is_file() {
                        debug!(path = %path.display(), "Optional configuration file not found");
                        continue;
                    }
                    config.load_file(path)?;
                    loaded.push(path.clone());
                }
                ConfigSource::Dir(path) => {
                    for file in dir_entries(config, path) {
                        config.load_file(&file)?;
                        loaded.push(file);
                    }
                }
            }
        }

        info!(
            sources = self.sources.len(),
            files = loaded.len(),
            "Applied configuration loader"
        );
        Ok(loaded)
    }
}

/// Files in `dir` with a registered decoder, sorted by file name.
fn dir_entries(config: &Configuration, dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Skipping unreadable configuration directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| config.has_parser(ext))
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(path = %dir.display(), files = files.len(), "Scanned configuration directory");
    files
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::LoaderError;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_builder_records_order() {
        let loader = ConfigLoader::new()
            .file("a.json")
            .optional_file("b.json")
            .dir("conf.d");
        assert_eq!(
            loader.sources(),
            &[
                ConfigSource::File("a.json".into()),
                ConfigSource::OptionalFile("b.json".into()),
                ConfigSource::Dir("conf.d".into()),
            ]
        );
    }

    #[test]
    fn test_missing_required_file_fails() {
        let mut config = Configuration::empty();
        let err = ConfigLoader::new()
            .file("/nonexistent/app.json")
            .apply(&mut config)
            .unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[test]
    fn test_optional_and_dir_sources_are_skipped_when_absent() {
        let mut config = Configuration::empty();
        let loaded = ConfigLoader::new()
            .optional_file("/nonexistent/local.json")
            .dir("/nonexistent/conf.d")
            .apply(&mut config)
            .unwrap();
        assert!(loaded.is_empty());
        assert!(config.values().is_empty());
    }

    #[test]
    fn test_dir_loads_in_lexical_order_and_skips_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "20-override.json", r#"{"port": 2}"#);
        write(dir.path(), "10-base.json", r#"{"port": 1, "name": "base"}"#);
        write(dir.path(), "README.txt", "not configuration");

        let mut config = Configuration::empty();
        let loaded = ConfigLoader::new().dir(dir.path()).apply(&mut config).unwrap();

        let names: Vec<_> = loaded
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-base.json", "20-override.json"]);
        assert_eq!(config.values().get("port"), Some(&json!(2)));
        assert_eq!(config.values().get("name"), Some(&json!("base")));
    }
}
