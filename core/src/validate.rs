//! Validation engine: audits loaded values against the declared schema.
//!
//! [`Configuration::validate`] walks the subtree, re-parses the *loaded*
//! value of every leaf (overrides, arguments and environment are not
//! consulted) and collects the failures into a [`ValidationReport`]. With
//! [`ValidateOptions::bail`] the first failure is returned as an error
//! instead.
//!
//! # Examples
//!
//! ```
//! use config_schema_core::{Configuration, ValidateOptions};
//! use serde_json::json;
//!
//! let mut config = Configuration::empty();
//! config.define_all(&json!({
//!     "port": "port",
//!     "sub": {"properties": {"timeout": "duration"}}
//! })).unwrap();
//! config.load(json!({"port": "http", "sub": {"timeout": "soon"}})).unwrap();
//!
//! let report = config.validate(ValidateOptions::default()).unwrap();
//! assert_eq!(report.len(), 2);
//! assert!(report.get("sub.timeout").is_some());
//!
//! let flat = config.validate(ValidateOptions::default().flat(true)).unwrap();
//! assert_eq!(flat.paths(), vec!["port", "sub.timeout"]);
//!
//! assert!(config.validate(ValidateOptions::default().bail(true)).is_err());
//! ```
//!
//! [`Configuration::validate`]: crate::Configuration::validate

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::config::Configuration;
use crate::error::{Result, ValidationError};
use crate::node::{NodeId, join_path};

/// Options for [`Configuration::validate`](crate::Configuration::validate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Return the first failure as an error instead of collecting.
    pub bail: bool,
    /// Key the report by full dotted path instead of nesting it.
    pub flat: bool,
}

impl ValidateOptions {
    pub fn bail(mut self, bail: bool) -> Self {
        self.bail = bail;
        self
    }

    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }
}

/// One position in a tree-shaped report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEntry {
    /// The leaf at this position failed.
    Error(ValidationError),
    /// A child node with at least one failing descendant.
    Node(BTreeMap<String, ReportEntry>),
}

/// Aggregated validation failures.
///
/// A key absent from the report means the property passed. Child nodes
/// without failures are omitted from the tree shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReport {
    /// Nested mapping mirroring the schema, relative to the validated node.
    Tree(BTreeMap<String, ReportEntry>),
    /// Single-level mapping keyed by full dotted path.
    Flat(BTreeMap<String, ValidationError>),
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Tree(entries) => entries.is_empty(),
            Self::Flat(errors) => errors.is_empty(),
        }
    }

    /// Number of failing leaves.
    pub fn len(&self) -> usize {
        self.errors().len()
    }

    /// Looks up the failure recorded for a dotted path.
    ///
    /// Tree reports are addressed relative to the validated node; flat
    /// reports by the full path used as key.
    pub fn get(&self, path: &str) -> Option<&ValidationError> {
        match self {
            Self::Flat(errors) => errors.get(path),
            Self::Tree(entries) => {
                let (parents, leaf) = match path.rsplit_once('.') {
                    Some((parents, leaf)) => (Some(parents), leaf),
                    None => (None, path),
                };
                let mut current = entries;
                for segment in parents.into_iter().flat_map(|p| p.split('.')) {
                    match current.get(segment)? {
                        ReportEntry::Node(children) => current = children,
                        ReportEntry::Error(_) => return None,
                    }
                }
                match current.get(leaf)? {
                    ReportEntry::Error(err) => Some(err),
                    ReportEntry::Node(_) => None,
                }
            }
        }
    }

    /// Every recorded failure, ordered by path.
    pub fn errors(&self) -> Vec<&ValidationError> {
        fn collect<'a>(entries: &'a BTreeMap<String, ReportEntry>, out: &mut Vec<&'a ValidationError>) {
            for entry in entries.values() {
                match entry {
                    ReportEntry::Error(err) => out.push(err),
                    ReportEntry::Node(children) => collect(children, out),
                }
            }
        }

        let mut out = Vec::new();
        match self {
            Self::Flat(errors) => out.extend(errors.values()),
            Self::Tree(entries) => collect(entries, &mut out),
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// `(path, error)` pairs, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.errors().into_iter().map(|e| (e.path.as_str(), e))
    }

    /// Full dotted paths of every failing property, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.errors().into_iter().map(|e| e.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors();
        if errors.is_empty() {
            return write!(f, "no validation errors");
        }
        for (i, err) in errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", err.path, err.message)?;
        }
        Ok(())
    }
}

impl Configuration {
    pub(crate) fn validate_at(&self, id: NodeId, options: ValidateOptions) -> Result<ValidationReport> {
        let mut flat = BTreeMap::new();
        let tree = self.audit(id, options, &mut flat)?;
        let report = if options.flat {
            ValidationReport::Flat(flat)
        } else {
            ValidationReport::Tree(tree)
        };
        debug!(
            path = %self.path_of(id),
            errors = report.len(),
            "Validated loaded values"
        );
        Ok(report)
    }

    fn audit(
        &self,
        id: NodeId,
        options: ValidateOptions,
        flat: &mut BTreeMap<String, ValidationError>,
    ) -> Result<BTreeMap<String, ReportEntry>> {
        let node = self.data(id);
        let mut entries = BTreeMap::new();

        for (name, child) in &node.children {
            let nested = self.audit(*child, options, flat)?;
            if !nested.is_empty() {
                entries.insert(name.clone(), ReportEntry::Node(nested));
            }
        }

        let base = self.path_of(id);
        for (name, leaf) in &node.leaves {
            let path = join_path(&base, name);
            let loaded = self.loaded_value(id, name).cloned();
            let Err(err) = leaf.rule.coerce(&self.formats, loaded, &path) else {
                continue;
            };
            if options.bail {
                return Err(err.into());
            }
            if options.flat {
                flat.insert(path, err);
            } else {
                entries.insert(name.clone(), ReportEntry::Error(err));
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ErrorKind, Sources};

    fn sample() -> Configuration {
        let mut config = Configuration::with_sources(Sources::new().with_env("PORT", "not-a-port"));
        config
            .define_all(&json!({
                "ip": {"format": "url", "default": "127.0.0.1"},
                "port": {"format": "port", "default": "8080", "env": "PORT"},
                "sub": {
                    "properties": {
                        "arg1": {"format": "int"},
                        "arg3": {"format": "duration", "default": "1 sec"},
                        "arg4": {"enum": ["aa", "bb", "cc"]},
                        "deep": {"properties": {"flag": "boolean"}}
                    }
                }
            }))
            .unwrap();
        config
    }

    #[test]
    fn test_clean_load_yields_empty_report() {
        let mut config = sample();
        config
            .load(json!({"ip": "localhost", "sub": {"arg1": "3", "arg4": null}}))
            .unwrap();
        let report = config.validate(ValidateOptions::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "no validation errors");
    }

    #[test]
    fn test_tree_report_mirrors_schema() {
        let mut config = sample();
        config
            .load(json!({"ip": 123, "sub": {"arg3": "later", "deep": {"flag": "perhaps"}}}))
            .unwrap();
        let report = config.validate(ValidateOptions::default()).unwrap();

        let ValidationReport::Tree(entries) = &report else {
            panic!("expected tree report");
        };
        assert!(matches!(entries.get("ip"), Some(ReportEntry::Error(_))));
        assert!(!entries.contains_key("port"));
        let Some(ReportEntry::Node(sub)) = entries.get("sub") else {
            panic!("expected nested sub report");
        };
        assert_eq!(sub.len(), 2);
        assert!(matches!(sub.get("arg3"), Some(ReportEntry::Error(e)) if e.path == "sub.arg3"));
        assert_eq!(report.get("sub.deep.flag").unwrap().path, "sub.deep.flag");
        assert!(report.get("sub.arg1").is_none());
        assert!(report.get("sub").is_none());
    }

    #[test]
    fn test_flat_report_uses_full_paths() {
        let mut config = sample();
        config
            .load(json!({"ip": 123, "sub": {"arg4": "zz"}}))
            .unwrap();
        let report = config.validate(ValidateOptions::default().flat(true)).unwrap();
        assert_eq!(report.paths(), vec!["ip", "sub.arg4"]);
        assert!(matches!(&report, ValidationReport::Flat(m) if m.contains_key("sub.arg4")));
    }

    #[test]
    fn test_bail_returns_first_failure() {
        let mut config = sample();
        config.load(json!({"ip": 123, "sub": {"arg1": "x"}})).unwrap();
        let err = config.validate(ValidateOptions::default().bail(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        // Children are audited before the leaves of the same node.
        assert_eq!(err.path(), Some("sub.arg1"));
    }

    #[test]
    fn test_only_loaded_values_are_audited() {
        let mut config = sample();
        config.set("ip", "10.0.0.1").unwrap();
        // The invalid PORT environment value is not part of the audit.
        let report = config.validate(ValidateOptions::default()).unwrap();
        assert!(report.is_empty());
        assert!(config.get("port").is_err());
    }

    #[test]
    fn test_subtree_validation() {
        let mut config = sample();
        config.load(json!({"ip": 123, "sub": {"arg1": 1.5}})).unwrap();
        let sub = config.get_child("sub").unwrap();

        let report = sub.validate(ValidateOptions::default()).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.get("arg1").is_some());

        let flat = sub.validate(ValidateOptions::default().flat(true)).unwrap();
        assert_eq!(flat.paths(), vec!["sub.arg1"]);
    }

    #[test]
    fn test_report_display() {
        let mut config = sample();
        config.load(json!({"ip": 123})).unwrap();
        let report = config.validate(ValidateOptions::default()).unwrap();
        assert_eq!(
            report.to_string(),
            "ip: \"123\" does not match \"url\" format."
        );
    }
}
