//! Format contracts and the per-configuration format registry.
//!
//! A [`Format`] is a named type contract made of a `validate` predicate and
//! a `parse` conversion. The registry resolves a name case-insensitively,
//! preferring custom registrations over the [built-in](crate::BuiltinFormat)
//! table. Registering a custom format never mutates the built-in table; it
//! only shadows a built-in of the same name inside the owning registry.
//!
//! Leaf declarations refer to formats through a small expression language
//! parsed by [`FormatSpec`]:
//!
//! - `int`: a single format,
//! - `url|ip`: alternatives, tried left to right,
//! - `[int]`: an array whose elements are each checked against `int`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::builtin::BuiltinFormat;
use crate::error::{ConfigError, Result};

/// A named type contract applied to raw configuration values.
///
/// Both methods have permissive defaults: a format without a validator
/// accepts everything, and a format without a parser returns the raw value.
/// `parse` is only called on values that passed `validate`.
pub trait Format: Send + Sync {
    /// Returns `true` if `value` satisfies this format.
    fn validate(&self, value: &Value) -> bool {
        let _ = value;
        true
    }

    /// Converts an already validated raw value into its parsed form.
    fn parse(&self, value: Value) -> Value {
        value
    }
}

type ValidateFn = dyn Fn(&Value) -> bool + Send + Sync;
type ParseFn = dyn Fn(Value) -> Value + Send + Sync;

/// A format assembled from closures, registered with
/// [`Configuration::add_format`](crate::Configuration::add_format).
///
/// # Examples
///
/// ```
/// use config_schema_core::{CustomFormat, Format};
/// use serde_json::json;
///
/// let country = CustomFormat::new("country-code")
///     .with_validate(|v| v.as_str().is_some_and(|s| s.len() == 2))
///     .with_parse(|v| json!(v.as_str().unwrap_or_default().to_uppercase()));
///
/// assert!(country.validate(&json!("tr")));
/// assert!(!country.validate(&json!("TRY")));
/// assert_eq!(country.parse(json!("tr")), json!("TR"));
/// ```
#[derive(Clone)]
pub struct CustomFormat {
    name: String,
    validate: Option<Arc<ValidateFn>>,
    parse: Option<Arc<ParseFn>>,
}

impl CustomFormat {
    /// Creates a format that accepts every value unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validate: None,
            parse: None,
        }
    }

    /// Sets the validation predicate.
    pub fn with_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// Sets the parse conversion.
    pub fn with_parse<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Format for CustomFormat {
    fn validate(&self, value: &Value) -> bool {
        self.validate.as_ref().is_none_or(|f| f(value))
    }

    fn parse(&self, value: Value) -> Value {
        match &self.parse {
            Some(f) => f(value),
            None => value,
        }
    }
}

impl fmt::Debug for CustomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFormat")
            .field("name", &self.name)
            .field("validate", &self.validate.is_some())
            .field("parse", &self.parse.is_some())
            .finish()
    }
}

/// Custom formats owned by one configuration root.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    custom: HashMap<String, Arc<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a custom format under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Argument`] if `name` is empty or contains one
    /// of the format expression characters `|`, `[` or `]`.
    pub fn register(&mut self, name: &str, format: impl Format + 'static) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::Argument(
                "You must provide a format name".to_string(),
            ));
        }
        if name.contains(['|', '[', ']']) {
            return Err(ConfigError::Argument(format!(
                "Format name \"{name}\" must not contain '|', '[' or ']'"
            )));
        }
        self.custom.insert(name.to_lowercase(), Arc::new(format));
        Ok(())
    }

    /// Resolves a format by name, custom registrations first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] if neither a custom nor a built-in
    /// format has this name.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_schema_core::FormatRegistry;
    /// use serde_json::json;
    ///
    /// let registry = FormatRegistry::new();
    /// let port = registry.lookup("PORT").unwrap();
    /// assert!(port.validate(&json!("8080")));
    /// assert!(registry.lookup("nope").is_err());
    /// ```
    pub fn lookup(&self, name: &str) -> Result<&dyn Format> {
        let key = name.trim().to_lowercase();
        if let Some(format) = self.custom.get(&key) {
            return Ok(format.as_ref());
        }
        BuiltinFormat::from_name(&key)
            .map(|b| b as &dyn Format)
            .ok_or_else(|| ConfigError::Schema(format!("Unknown format \"{name}\"")))
    }

    /// Returns `true` if `name` resolves to a custom or built-in format.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Names of the registered custom formats (lowercased).
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.custom_names().collect();
        names.sort_unstable();
        f.debug_struct("FormatRegistry")
            .field("custom", &names)
            .finish()
    }
}

/// A parsed format expression: alternatives, optionally wrapped as an array.
///
/// # Examples
///
/// ```
/// use config_schema_core::FormatSpec;
///
/// let spec = FormatSpec::parse("[url|ip]").unwrap();
/// assert!(spec.array);
/// assert_eq!(spec.alternatives, vec!["url", "ip"]);
///
/// let spec = FormatSpec::parse("port").unwrap();
/// assert!(!spec.array);
/// assert_eq!(spec.alternatives, vec!["port"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// `true` when the expression was bracket-wrapped (`[x]`).
    pub array: bool,
    /// Format names to try in order.
    pub alternatives: Vec<String>,
}

impl FormatSpec {
    /// Parses a format expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] if the expression or one of its
    /// alternatives is empty.
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        let (array, inner) = match trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };

        let alternatives: Vec<String> = inner.split('|').map(|s| s.trim().to_string()).collect();
        if alternatives.iter().any(String::is_empty) {
            return Err(ConfigError::Schema(format!(
                "Invalid format expression \"{expr}\""
            )));
        }

        Ok(Self {
            array,
            alternatives,
        })
    }

    /// Checks that every alternative is known to `registry`.
    pub(crate) fn check_registered(&self, registry: &FormatRegistry) -> Result<()> {
        for name in &self.alternatives {
            registry.lookup(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FormatRegistry::new();
        assert!(registry.contains("Int"));
        assert!(registry.contains("BYTESIZE"));
        assert!(!registry.contains("integer"));
    }

    #[test]
    fn test_unknown_format_is_schema_error() {
        let registry = FormatRegistry::new();
        let err = registry.lookup("notexists").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().contains("Unknown format"));
    }

    #[test]
    fn test_custom_format_shadows_builtin() {
        let mut registry = FormatRegistry::new();
        registry
            .register("int", CustomFormat::new("int").with_validate(|v| v == &json!(42)))
            .unwrap();

        assert!(registry.lookup("int").unwrap().validate(&json!(42)));
        assert!(!registry.lookup("INT").unwrap().validate(&json!(7)));
        // A fresh registry still sees the built-in.
        assert!(FormatRegistry::new().lookup("int").unwrap().validate(&json!(7)));
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let mut registry = FormatRegistry::new();
        let err = registry.register("", CustomFormat::new("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = registry.register("a|b", CustomFormat::new("a|b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_custom_format_defaults_are_permissive() {
        let format = CustomFormat::new("anything");
        assert!(format.validate(&json!({"a": 1})));
        assert_eq!(format.parse(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_spec_rejects_empty_alternative() {
        assert!(FormatSpec::parse("int|").is_err());
        assert!(FormatSpec::parse("[]").is_err());
        assert!(FormatSpec::parse("").is_err());
    }

    #[test]
    fn test_spec_check_registered() {
        let registry = FormatRegistry::new();
        assert!(FormatSpec::parse("url|ip").unwrap().check_registered(&registry).is_ok());
        assert!(FormatSpec::parse("[url|nope]").unwrap().check_registered(&registry).is_err());
    }
}
