//! Value resolution: source precedence and format/enum coercion.
//!
//! The effective raw value of a leaf is the first defined candidate of:
//!
//! 1. the explicit override assigned with `set`,
//! 2. the argument map entry named by the leaf's `arg`,
//! 3. the environment variable named by the leaf's `env`,
//! 4. the loaded value at the leaf's path in the value store,
//! 5. the declared default.
//!
//! The raw value is then checked (enum) or validated and parsed (format).

use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::format::{FormatRegistry, FormatSpec};
use crate::sources::Sources;
use crate::types::{LeafDefinition, LeafKind};

/// Which source produced a leaf's effective raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// Assigned with `set`.
    Override,
    /// Read from the argument map.
    Arg,
    /// Read from the environment.
    Env,
    /// Read from the loaded value store.
    Loaded,
    /// The declared default.
    Default,
}

/// Compiled form of a leaf's [`LeafKind`].
#[derive(Debug, Clone)]
pub(crate) enum Rule {
    Format { expr: String, spec: FormatSpec },
    Enum(Vec<Value>),
}

impl Rule {
    /// Compiles a leaf kind, checking that every referenced format exists.
    pub(crate) fn compile(kind: &LeafKind, formats: &FormatRegistry) -> Result<Self> {
        match kind {
            LeafKind::Format(expr) => {
                let spec = FormatSpec::parse(expr)?;
                spec.check_registered(formats)?;
                Ok(Self::Format {
                    expr: expr.clone(),
                    spec,
                })
            }
            LeafKind::Enum(values) => Ok(Self::Enum(values.clone())),
        }
    }

    /// Checks and converts a raw value. `None` (undefined) passes through.
    pub(crate) fn coerce(
        &self,
        formats: &FormatRegistry,
        raw: Option<Value>,
        path: &str,
    ) -> std::result::Result<Option<Value>, ValidationError> {
        match raw {
            Some(raw) => self.apply(formats, raw, path).map(Some),
            None => Ok(None),
        }
    }

    fn apply(
        &self,
        formats: &FormatRegistry,
        raw: Value,
        path: &str,
    ) -> std::result::Result<Value, ValidationError> {
        match self {
            Self::Enum(values) => {
                if raw.is_null() || values.iter().any(|v| same_value(v, &raw)) {
                    Ok(raw)
                } else {
                    Err(ValidationError::new(
                        path,
                        format!(
                            "\"{}\" is not one of {} enum values.",
                            display(&raw),
                            Value::Array(values.clone())
                        ),
                    ))
                }
            }
            Self::Format { expr, spec } if spec.array => {
                if raw.is_null() {
                    return Ok(raw);
                }
                let items = match raw {
                    Value::Array(items) => items,
                    scalar => vec![scalar],
                };
                let mut parsed = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match apply_alternatives(formats, &spec.alternatives, item) {
                        Ok(value) => parsed.push(value),
                        Err(item) => {
                            return Err(ValidationError::new(
                                path,
                                format!(
                                    "Element {index} \"{}\" does not match \"{expr}\" format.",
                                    display(&item)
                                ),
                            ));
                        }
                    }
                }
                Ok(Value::Array(parsed))
            }
            Self::Format { expr, spec } => apply_alternatives(formats, &spec.alternatives, raw)
                .map_err(|raw| {
                    let message = if spec.alternatives.len() > 1 {
                        format!("\"{}\" does not match one of \"{expr}\" formats.", display(&raw))
                    } else {
                        format!("\"{}\" does not match \"{expr}\" format.", display(&raw))
                    };
                    ValidationError::new(path, message)
                }),
        }
    }
}

/// Tries each format in order; returns the rejected value on failure.
fn apply_alternatives(
    formats: &FormatRegistry,
    alternatives: &[String],
    value: Value,
) -> std::result::Result<Value, Value> {
    for name in alternatives {
        let Ok(format) = formats.lookup(name) else {
            continue;
        };
        if format.validate(&value) {
            return Ok(format.parse(value));
        }
    }
    Err(value)
}

/// Picks the effective raw value of a leaf by source precedence.
pub(crate) fn pick_raw(
    definition: &LeafDefinition,
    assigned: Option<&Value>,
    sources: &Sources,
    loaded: Option<&Value>,
) -> Option<(Value, ValueSource)> {
    if let Some(value) = assigned {
        return Some((value.clone(), ValueSource::Override));
    }
    if let Some(value) = definition.arg.as_deref().and_then(|key| sources.arg(key)) {
        return Some((Value::String(value.to_string()), ValueSource::Arg));
    }
    if let Some(value) = definition.env.as_deref().and_then(|name| sources.env(name)) {
        return Some((Value::String(value.to_string()), ValueSource::Env));
    }
    if let Some(value) = loaded {
        return Some((value.clone(), ValueSource::Loaded));
    }
    definition
        .default
        .clone()
        .map(|value| (value, ValueSource::Default))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Enum membership equality: numbers compare by value, so `1.0` matches `1`.
fn same_value(member: &Value, raw: &Value) -> bool {
    match (member, raw) {
        (Value::Number(a), Value::Number(b)) => {
            a == b || ((a.is_f64() || b.is_f64()) && a.as_f64() == b.as_f64())
        }
        _ => member == raw,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::format::CustomFormat;

    fn rule(expr: &str) -> Rule {
        Rule::compile(&LeafKind::Format(expr.into()), &FormatRegistry::new()).unwrap()
    }

    #[test]
    fn test_compile_rejects_unknown_format() {
        let registry = FormatRegistry::new();
        assert!(Rule::compile(&LeafKind::Format("int|nope".into()), &registry).is_err());
    }

    #[test]
    fn test_undefined_passes_through() {
        let registry = FormatRegistry::new();
        assert_eq!(rule("int").coerce(&registry, None, "x").unwrap(), None);
    }

    #[test]
    fn test_array_format_wraps_scalar() {
        let registry = FormatRegistry::new();
        let r = rule("[int]");
        assert_eq!(r.apply(&registry, json!("5"), "a").unwrap(), json!([5]));
        assert_eq!(r.apply(&registry, json!([1, "2", 3]), "a").unwrap(), json!([1, 2, 3]));
        assert_eq!(r.apply(&registry, Value::Null, "a").unwrap(), Value::Null);

        let err = r.apply(&registry, json!([1, "x"]), "a").unwrap_err();
        assert_eq!(err.path, "a");
        assert!(err.message.contains("Element 1"));
    }

    #[test]
    fn test_alternatives_tried_in_order() {
        let registry = FormatRegistry::new();
        let r = rule("port|duration");
        assert_eq!(r.apply(&registry, json!("80"), "p").unwrap(), json!(80));
        assert_eq!(r.apply(&registry, json!("2 s"), "p").unwrap(), json!(2000));
        let err = r.apply(&registry, json!("nope"), "p").unwrap_err();
        assert!(err.message.contains("one of \"port|duration\""));
    }

    #[test]
    fn test_enum_membership() {
        let registry = FormatRegistry::new();
        let r = Rule::compile(&LeafKind::Enum(vec![json!(1), json!("a")]), &registry).unwrap();
        assert_eq!(r.apply(&registry, json!(1), "e").unwrap(), json!(1));
        assert_eq!(r.apply(&registry, Value::Null, "e").unwrap(), Value::Null);
        // No coercion: the string "1" is not the number 1.
        assert!(r.apply(&registry, json!("1"), "e").is_err());
    }

    #[test]
    fn test_enum_numbers_compare_by_value() {
        let registry = FormatRegistry::new();
        let r = Rule::compile(&LeafKind::Enum(vec![json!(1), json!(2.5)]), &registry).unwrap();
        // The raw value comes back as given.
        assert_eq!(r.apply(&registry, json!(1.0), "e").unwrap(), json!(1.0));
        assert_eq!(r.apply(&registry, json!(2.5), "e").unwrap(), json!(2.5));
        assert!(r.apply(&registry, json!(1.5), "e").is_err());
        assert!(r.apply(&registry, json!(2), "e").is_err());
        assert!(r.apply(&registry, json!([1]), "e").is_err());
    }

    #[test]
    fn test_custom_format_error_message() {
        let mut registry = FormatRegistry::new();
        registry
            .register(
                "even",
                CustomFormat::new("even").with_validate(|v| v.as_i64().is_some_and(|n| n % 2 == 0)),
            )
            .unwrap();
        let r = Rule::compile(&LeafKind::Format("even".into()), &registry).unwrap();
        let err = r.apply(&registry, json!(3), "n").unwrap_err();
        assert_eq!(err.message, "\"3\" does not match \"even\" format.");
    }

    #[test]
    fn test_precedence_order() {
        let def = LeafDefinition::format("port")
            .with_arg("port")
            .with_env("PORT")
            .with_default(8080);
        let loaded = json!(9000);
        let both = Sources::new().with_arg("port", "7000").with_env("PORT", "6000");
        let env_only = Sources::new().with_env("PORT", "6000");
        let none = Sources::new();

        let assigned = json!(1234);
        assert_eq!(
            pick_raw(&def, Some(&assigned), &both, Some(&loaded)),
            Some((json!(1234), ValueSource::Override))
        );
        assert_eq!(
            pick_raw(&def, None, &both, Some(&loaded)),
            Some((json!("7000"), ValueSource::Arg))
        );
        assert_eq!(
            pick_raw(&def, None, &env_only, Some(&loaded)),
            Some((json!("6000"), ValueSource::Env))
        );
        assert_eq!(
            pick_raw(&def, None, &none, Some(&loaded)),
            Some((json!(9000), ValueSource::Loaded))
        );
        assert_eq!(
            pick_raw(&def, None, &none, None),
            Some((json!(8080), ValueSource::Default))
        );
    }

    #[test]
    fn test_unbound_sources_are_ignored() {
        let def = LeafDefinition::format("int");
        let sources = Sources::new().with_arg("n", "1").with_env("N", "2");
        assert_eq!(pick_raw(&def, None, &sources, None), None);
    }
}
