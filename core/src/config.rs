//! The configuration root: schema arena, value store, formats and decoders.
//!
//! A [`Configuration`] owns everything a schema needs: the node tree, the
//! loaded values, the custom format registry, the file decoder table and a
//! snapshot of the argument/environment [`Sources`]. Member operations on
//! the root take dotted keys (`"sub.arg3"`) and delegate to the root node.
//!
//! # Example
//!
//! ```
//! use config_schema_core::{Configuration, LeafDefinition, Sources};
//! use serde_json::json;
//!
//! let mut config = Configuration::with_sources(Sources::new().with_env("PORT", "6000"));
//! config
//!     .define("port", LeafDefinition::format("port").with_env("PORT").with_default(8080))?
//!     .define("name", LeafDefinition::format("string").with_default("demo"))?;
//! config.load(json!({"port": 9000, "name": "svc"}))?;
//!
//! // The environment outranks loaded values.
//! assert_eq!(config.get("port")?, Some(json!(6000)));
//! assert_eq!(config.get("name")?, Some(json!("svc")));
//! # Ok::<(), config_schema_core::ConfigError>(())
//! ```

use std::ffi::OsStr;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::decoder::{DecodeError, Decoder, DecoderTable, decoder};
use crate::error::{ConfigError, Result};
use crate::format::{CustomFormat, Format, FormatRegistry};
use crate::merge::merge_maps;
use crate::node::{Node, NodeId, NodeMut, SchemaNode};
use crate::resolve::ValueSource;
use crate::sources::Sources;
use crate::types::{Definition, NodeDefinition};
use crate::validate::{ValidateOptions, ValidationReport};

/// Root of a configuration schema and its values.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) values: Map<String, Value>,
    pub(crate) formats: FormatRegistry,
    pub(crate) decoders: DecoderTable,
    pub(crate) sources: Sources,
}

impl Configuration {
    /// Creates an empty configuration reading the process environment.
    ///
    /// Command-line values are bound by building the snapshot explicitly:
    /// `Configuration::with_sources(Sources::from_process().with_matches(&matches))`.
    pub fn new() -> Self {
        Self::with_sources(Sources::from_process())
    }

    /// Creates an empty configuration with no argument or environment input.
    pub fn empty() -> Self {
        Self::with_sources(Sources::new())
    }

    /// Creates an empty configuration resolving against `sources`.
    pub fn with_sources(sources: Sources) -> Self {
        Self {
            nodes: vec![SchemaNode::root()],
            values: Map::new(),
            formats: FormatRegistry::new(),
            decoders: DecoderTable::new(),
            sources,
        }
    }

    // ------------------------------------------------------------------
    // Tree access
    // ------------------------------------------------------------------

    pub fn root(&self) -> Node<'_> {
        Node::new(self, NodeId::ROOT)
    }

    pub fn root_mut(&mut self) -> NodeMut<'_> {
        NodeMut::new(self, NodeId::ROOT)
    }

    /// View of a node by id.
    ///
    /// Returns `None` for ids from another configuration and for children
    /// that were replaced by [`add_child`](Self::add_child).
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        self.is_attached(id).then(|| Node::new(self, id))
    }

    /// Descends a dotted path of child names from the root.
    pub fn get_child(&self, path: &str) -> Option<Node<'_>> {
        self.root().get_child(path)
    }

    pub fn get_child_mut(&mut self, path: &str) -> Option<NodeMut<'_>> {
        if path.is_empty() {
            return None;
        }
        let id = self.descend(NodeId::ROOT, path)?;
        Some(NodeMut::new(self, id))
    }

    /// Creates a child of the root, replacing any existing child of that name.
    pub fn add_child(&mut self, name: &str, def: Option<NodeDefinition>) -> Result<NodeMut<'_>> {
        let id = self.add_child_at(NodeId::ROOT, name, def)?;
        Ok(NodeMut::new(self, id))
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Declares a leaf or child node on the root.
    ///
    /// See [`NodeMut::define`].
    pub fn define(&mut self, name: &str, def: impl Into<Definition>) -> Result<&mut Self> {
        self.define_at(NodeId::ROOT, name, def.into())?;
        Ok(self)
    }

    /// Declares every entry of a JSON object on the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_schema_core::Configuration;
    /// use serde_json::json;
    ///
    /// let mut config = Configuration::empty();
    /// config.define_all(&json!({
    ///     "verbose": "boolean",
    ///     "level": {"enum": ["debug", "info"], "default": "info"},
    ///     "db": {"doc": "Database", "properties": {"port": {"format": "port", "default": 5432}}}
    /// })).unwrap();
    ///
    /// assert_eq!(config.get("level").unwrap(), Some(json!("info")));
    /// assert_eq!(config.get("db.port").unwrap(), Some(json!(5432)));
    /// assert_eq!(config.get("verbose").unwrap(), None);
    /// ```
    pub fn define_all(&mut self, defs: &Value) -> Result<&mut Self> {
        self.root_mut().define_all(defs)?;
        Ok(self)
    }

    /// Declares every `(name, definition)` pair on the root.
    pub fn define_many<I, K, D>(&mut self, defs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: Into<Definition>,
    {
        self.root_mut().define_many(defs)?;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Formats and decoders
    // ------------------------------------------------------------------

    /// Registers a closure-built format under its own name.
    ///
    /// Later declarations may refer to it; it shadows a built-in of the
    /// same name (case-insensitively) for this configuration only.
    pub fn add_format(&mut self, format: CustomFormat) -> Result<&mut Self> {
        let name = format.name().to_string();
        self.register_format(&name, format)
    }

    /// Registers any [`Format`] implementation under `name`.
    pub fn register_format(&mut self, name: &str, format: impl Format + 'static) -> Result<&mut Self> {
        self.formats.register(name, format)?;
        debug!(format = name, "Registered format");
        Ok(self)
    }

    /// Registers several closure-built formats.
    pub fn add_formats(&mut self, formats: impl IntoIterator<Item = CustomFormat>) -> Result<&mut Self> {
        for format in formats {
            self.add_format(format)?;
        }
        Ok(self)
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Sets a single decoder for files with extension `ext`.
    pub fn add_parser<F>(&mut self, ext: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(&[u8]) -> std::result::Result<Value, DecodeError> + Send + Sync + 'static,
    {
        self.add_parser_chain(ext, vec![decoder(f)])
    }

    /// Sets an ordered chain of candidate decoders for extension `ext`.
    ///
    /// The chain replaces any previous registration for the extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Argument`] for an empty extension or chain.
    pub fn add_parser_chain(&mut self, ext: &str, chain: Vec<Decoder>) -> Result<&mut Self> {
        if ext.trim_start_matches('.').trim().is_empty() {
            return Err(ConfigError::Argument(
                "You must provide a file extension".to_string(),
            ));
        }
        if chain.is_empty() {
            return Err(ConfigError::Argument(format!(
                "You must provide at least one decoder for \"{ext}\""
            )));
        }
        debug!(ext, decoders = chain.len(), "Registered file decoders");
        self.decoders.set(ext, chain);
        Ok(self)
    }

    /// Registers decoder chains for several extensions.
    pub fn add_parsers<I, S>(&mut self, parsers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, Vec<Decoder>)>,
        S: AsRef<str>,
    {
        for (ext, chain) in parsers {
            self.add_parser_chain(ext.as_ref(), chain)?;
        }
        Ok(self)
    }

    /// Returns `true` if files with extension `ext` can be loaded.
    pub fn has_parser(&self, ext: &str) -> bool {
        self.decoders.contains(ext)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Deep-merges a JSON object into the value store.
    ///
    /// Keys need not be declared; undeclared keys are kept but never
    /// resolved. Loading does not validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Argument`] if `data` is not an object.
    pub fn load(&mut self, data: Value) -> Result<()> {
        let Value::Object(data) = data else {
            return Err(ConfigError::Argument(
                "Loaded data must be an object".to_string(),
            ));
        };
        debug!(keys = data.len(), "Merging loaded values");
        merge_maps(&mut self.values, data);
        Ok(())
    }

    /// Reads and merges a file, choosing decoders by its extension.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file has no extension, no decoder is
    /// registered for it, the file cannot be read, or no decoder in the
    /// chain produces an object.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .ok_or_else(|| ConfigError::io(path, "file has no extension"))?;
        let ext = ext.to_string();
        self.load_file_as(path, &ext)
    }

    /// Reads and merges a file using the decoders registered for `ext`,
    /// regardless of the file's own extension.
    pub fn load_file_as(&mut self, path: impl AsRef<Path>, ext: &str) -> Result<()> {
        let path = path.as_ref();
        let chain = self
            .decoders
            .get(ext)
            .filter(|chain| !chain.is_empty())
            .ok_or_else(|| ConfigError::io(path, format!("no decoder registered for \"{ext}\"")))?
            .to_vec();

        let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e.to_string()))?;
        let data = decode_object(&chain, &bytes, path)?;
        merge_maps(&mut self.values, data);
        info!(path = %path.display(), ext, "Loaded configuration file");
        Ok(())
    }

    /// Loads several files in order; later files win on conflict.
    pub fn load_files<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.load_file(path)?;
        }
        Ok(())
    }

    /// Clears the value store. Overrides and declarations are kept.
    pub fn unload(&mut self) {
        debug!("Cleared loaded values");
        self.values.clear();
    }

    /// The loaded value store.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    // ------------------------------------------------------------------
    // Member operations, delegated to the root node
    // ------------------------------------------------------------------

    pub fn has(&self, key: &str) -> bool {
        self.root().has(key)
    }

    /// Resolves and parses the value of `key`. See [`Node::get`].
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.root().get(key)
    }

    pub fn get_original(&self, key: &str) -> Result<Option<Value>> {
        self.root().get_original(key)
    }

    pub fn source(&self, key: &str) -> Result<Option<ValueSource>> {
        self.root().source(key)
    }

    pub fn default(&self, key: &str) -> Result<Option<Value>> {
        self.root().default(key)
    }

    pub fn default_parsed(&self, key: &str) -> Result<Option<Value>> {
        self.root().default_parsed(key)
    }

    /// Validates `value` and stores it as the override for `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_schema_core::{Configuration, ErrorKind};
    /// use serde_json::json;
    ///
    /// let mut config = Configuration::empty();
    /// config.define("sub", config_schema_core::NodeDefinition::new()
    ///     .with_property("mode", config_schema_core::LeafDefinition::one_of(["aa", "bb"])))?;
    ///
    /// config.set("sub.mode", "bb")?;
    /// assert_eq!(config.get("sub.mode")?, Some(json!("bb")));
    ///
    /// let err = config.set("sub.mode", "zz").unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::Validation);
    /// assert_eq!(config.get("sub.mode")?, Some(json!("bb")));
    /// # Ok::<(), config_schema_core::ConfigError>(())
    /// ```
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_at(NodeId::ROOT, key, Some(value.into()))?;
        Ok(self)
    }

    /// Clears the override for `key`.
    pub fn reset(&mut self, key: &str) -> Result<&mut Self> {
        self.set_at(NodeId::ROOT, key, None)?;
        Ok(self)
    }

    pub fn get_schema(&self) -> Value {
        self.root().get_schema()
    }

    /// Resolves every declared leaf into one nested object.
    pub fn to_json(&self) -> Result<Value> {
        self.root().to_json()
    }

    /// Audits loaded values against the schema.
    ///
    /// See the [`validate`](crate::validate) module for the report shapes.
    pub fn validate(&self, options: ValidateOptions) -> Result<ValidationReport> {
        self.validate_at(NodeId::ROOT, options)
    }
}

/// Tries each decoder in order and returns the first object produced.
fn decode_object(chain: &[Decoder], bytes: &[u8], path: &Path) -> Result<Map<String, Value>> {
    for (index, decode) in chain.iter().enumerate() {
        match decode(bytes) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(other) => {
                debug!(
                    path = %path.display(),
                    decoder = index,
                    kind = value_kind(&other),
                    "Decoder did not produce an object"
                );
            }
            Err(e) => {
                debug!(path = %path.display(), decoder = index, error = %e, "Decoder failed");
            }
        }
    }
    Err(ConfigError::io(path, "no decoder produced an object"))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
