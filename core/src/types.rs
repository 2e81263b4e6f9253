//! Declaration types for the schema tree.
//!
//! A [`Definition`] is either a [`LeafDefinition`] (one typed property) or a
//! [`NodeDefinition`] (a named group of further definitions). The shape of a
//! loosely typed declaration (string, array, or object) is decided once, in
//! [`Definition::from_value`], and everything downstream matches on the
//! variant.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// How a leaf constrains its value.
///
/// # Examples
///
/// ```
/// use config_schema_core::LeafKind;
/// use serde_json::json;
///
/// let kind = LeafKind::Enum(vec![json!("aa"), json!("bb")]);
/// assert!(matches!(kind, LeafKind::Enum(ref v) if v.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    /// A format expression such as `"port"`, `"url|ip"` or `"[int]"`.
    Format(String),
    /// A fixed set of literal values.
    Enum(Vec<Value>),
}

/// Schema for one scalar, array-of-scalar, or enum property.
///
/// Use [`format`](LeafDefinition::format) or
/// [`one_of`](LeafDefinition::one_of) to create a definition, then chain the
/// builder methods.
///
/// # Examples
///
/// ```
/// use config_schema_core::LeafDefinition;
/// use serde_json::json;
///
/// let port = LeafDefinition::format("port")
///     .with_default(8080)
///     .with_env("PORT")
///     .with_arg("port")
///     .with_doc("The port to bind.");
/// assert_eq!(port.default, Some(json!(8080)));
/// assert_eq!(port.env.as_deref(), Some("PORT"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafDefinition {
    /// Format expression or enum set.
    #[serde(flatten)]
    pub kind: LeafKind,
    /// Declared default; validated when the leaf is defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Documentation text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Environment variable consulted during resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Argument-map key consulted during resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
}

impl LeafDefinition {
    /// Creates a leaf constrained by a format expression.
    pub fn format(expr: impl Into<String>) -> Self {
        Self::new(LeafKind::Format(expr.into()))
    }

    /// Creates a leaf constrained to a fixed set of values.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(LeafKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    fn new(kind: LeafKind) -> Self {
        Self {
            kind,
            default: None,
            doc: None,
            env: None,
            arg: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>) -> Self {
        self.env = Some(name.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>) -> Self {
        self.arg = Some(key.into());
        self
    }

    /// Plain description of this leaf, as returned by `get_schema`.
    ///
    /// Unset options are left out, so the result is accepted again by
    /// [`Definition::from_value`].
    pub fn to_schema(&self) -> Value {
        to_object(self)
    }
}

impl From<&str> for LeafDefinition {
    fn from(expr: &str) -> Self {
        Self::format(expr)
    }
}

/// A named group of definitions, declared as a child node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub properties: BTreeMap<String, Definition>,
}

impl NodeDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Adds a property (leaf or nested node).
    pub fn with_property(mut self, name: impl Into<String>, def: impl Into<Definition>) -> Self {
        self.properties.insert(name.into(), def.into());
        self
    }
}

/// A declaration routed by shape: a leaf property or a child node.
///
/// Serializes to the loose shape read by [`from_value`](Self::from_value).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Definition {
    Leaf(LeafDefinition),
    Node(NodeDefinition),
}

impl Definition {
    /// Converts a loosely shaped declaration into a typed definition.
    ///
    /// - a string is a format leaf,
    /// - an array is an enum leaf,
    /// - an object must carry exactly one of `format`, `enum` or
    ///   `properties`, plus optional `default`, `doc` (or `description`),
    ///   `env` and `arg`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when an object carries none or more
    /// than one of `format`/`enum`/`properties`, and
    /// [`ConfigError::Argument`] for any other malformed shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_schema_core::{Definition, LeafDefinition};
    /// use serde_json::json;
    ///
    /// let def = Definition::from_value(&json!("port")).unwrap();
    /// assert_eq!(def, Definition::Leaf(LeafDefinition::format("port")));
    ///
    /// let def = Definition::from_value(&json!({"properties": {"host": "url"}})).unwrap();
    /// assert!(matches!(def, Definition::Node(ref n) if n.properties.len() == 1));
    ///
    /// assert!(Definition::from_value(&json!({"format": "int", "enum": [1]})).is_err());
    /// ```
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(expr) => Ok(Self::Leaf(LeafDefinition::format(expr.as_str()))),
            Value::Array(items) => Ok(Self::Leaf(LeafDefinition::one_of(items.iter().cloned()))),
            Value::Object(obj) => Self::from_object(obj),
            other => Err(ConfigError::Argument(format!(
                "You must provide a format name, an enum array or a definition object, got {other}"
            ))),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self> {
        let present = ["format", "enum", "properties"]
            .into_iter()
            .filter(|k| obj.contains_key(*k))
            .count();
        if present > 1 {
            return Err(ConfigError::Schema(
                "You can set only one of the \"format\", \"enum\" or \"properties\" properties"
                    .to_string(),
            ));
        }
        if present == 0 {
            return Err(ConfigError::Schema(
                "One of the \"format\", \"enum\" or \"properties\" properties must be set"
                    .to_string(),
            ));
        }

        let doc = match optional_string(obj, "doc")? {
            Some(doc) => Some(doc),
            None => optional_string(obj, "description")?,
        };

        if let Some(props) = obj.get("properties") {
            let Value::Object(props) = props else {
                return Err(ConfigError::Argument(
                    "\"properties\" must be an object".to_string(),
                ));
            };
            let mut node = NodeDefinition {
                doc,
                properties: BTreeMap::new(),
            };
            for (name, def) in props {
                node.properties.insert(name.clone(), Self::from_value(def)?);
            }
            return Ok(Self::Node(node));
        }

        let kind = match (obj.get("format"), obj.get("enum")) {
            (Some(Value::String(expr)), _) => LeafKind::Format(expr.clone()),
            (Some(_), _) => {
                return Err(ConfigError::Argument(
                    "\"format\" property must be string".to_string(),
                ));
            }
            (None, Some(Value::Array(items))) => LeafKind::Enum(items.clone()),
            (None, Some(scalar)) => LeafKind::Enum(vec![scalar.clone()]),
            (None, None) => {
                return Err(ConfigError::Schema(
                    "One of the \"format\" or \"enum\" properties must be set".to_string(),
                ));
            }
        };

        Ok(Self::Leaf(LeafDefinition {
            kind,
            default: obj.get("default").cloned(),
            doc,
            env: optional_string(obj, "env")?,
            arg: optional_string(obj, "arg")?,
        }))
    }
}

impl From<LeafDefinition> for Definition {
    fn from(def: LeafDefinition) -> Self {
        Self::Leaf(def)
    }
}

impl From<NodeDefinition> for Definition {
    fn from(def: NodeDefinition) -> Self {
        Self::Node(def)
    }
}

impl From<&str> for Definition {
    fn from(expr: &str) -> Self {
        Self::Leaf(LeafDefinition::format(expr))
    }
}

// Serializing the definition types cannot fail: every map key is a string.
fn to_object(value: &impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::Argument(format!(
            "\"{key}\" property must be string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_array_is_enum_leaf() {
        let def = Definition::from_value(&json!(["aa", "bb", "cc"])).unwrap();
        assert_eq!(def, Definition::Leaf(LeafDefinition::one_of(["aa", "bb", "cc"])));
    }

    #[test]
    fn test_scalar_enum_is_coerced_to_set() {
        let def = Definition::from_value(&json!({"enum": "a"})).unwrap();
        assert_eq!(def, Definition::Leaf(LeafDefinition::one_of(["a"])));
    }

    #[test]
    fn test_object_carries_options() {
        let def = Definition::from_value(&json!({
            "format": "port",
            "default": "8080",
            "description": "The port to bind.",
            "env": "PORT",
            "arg": "port"
        }))
        .unwrap();
        let expected = LeafDefinition::format("port")
            .with_default("8080")
            .with_doc("The port to bind.")
            .with_env("PORT")
            .with_arg("port");
        assert_eq!(def, Definition::Leaf(expected));
    }

    #[test]
    fn test_nested_properties() {
        let def = Definition::from_value(&json!({
            "doc": "Sub properties",
            "properties": {
                "arg1": "int",
                "inner": {"properties": {"x": ["a"]}}
            }
        }))
        .unwrap();
        let Definition::Node(node) = def else {
            panic!("expected node");
        };
        assert_eq!(node.doc.as_deref(), Some("Sub properties"));
        assert!(matches!(node.properties["inner"], Definition::Node(_)));
        assert!(matches!(node.properties["arg1"], Definition::Leaf(_)));
    }

    #[test]
    fn test_malformed_shapes() {
        let err = Definition::from_value(&json!(123)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        let err = Definition::from_value(&json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err = Definition::from_value(&json!({"format": "int", "properties": {}})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err = Definition::from_value(&json!({"format": 123})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(err.to_string().contains("must be string"));

        let err = Definition::from_value(&json!({"format": "int", "env": 5})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        let err = Definition::from_value(&json!({"properties": []})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_leaf_schema_description() {
        let leaf = LeafDefinition::format("duration").with_default("1 sec");
        assert_eq!(leaf.to_schema(), json!({"format": "duration", "default": "1 sec"}));

        let leaf = LeafDefinition::one_of(["aa", "bb"]).with_env("MODE");
        assert_eq!(leaf.to_schema(), json!({"enum": ["aa", "bb"], "env": "MODE"}));
    }

    #[test]
    fn test_serialized_definition_reads_back() {
        let raw = json!({
            "doc": "Server settings",
            "properties": {
                "port": {"format": "port", "default": 8080, "env": "PORT", "arg": "port"},
                "mode": {"enum": ["dev", "prod"], "doc": "Run mode"},
                "tls": {"properties": {"cert": "string"}}
            }
        });
        let def = Definition::from_value(&raw).unwrap();
        let value = serde_json::to_value(&def).unwrap();

        assert_eq!(value["properties"]["tls"], json!({"properties": {"cert": {"format": "string"}}}));
        assert_eq!(value["properties"]["mode"], json!({"enum": ["dev", "prod"], "doc": "Run mode"}));
        assert_eq!(Definition::from_value(&value).unwrap(), def);
    }
}
