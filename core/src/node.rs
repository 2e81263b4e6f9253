//! The schema tree: nodes, leaf declarations and dotted-path addressing.
//!
//! Nodes are stored in an arena owned by the [`Configuration`] root and
//! addressed by [`NodeId`]. Each node keeps the id of its parent, so paths
//! are computed by walking upwards while ownership stays with the root.
//! [`Node`] and [`NodeMut`] are borrowed views that expose the per-node API.
//!
//! Member operations (`get`, `set`, `default`, `has`, `reset`) take a dotted
//! key relative to the node: everything before the last dot names the
//! owning node, the last segment names the leaf.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Configuration;
use crate::error::{ConfigError, Result};
use crate::resolve::{Rule, ValueSource, pick_raw};
use crate::types::{Definition, LeafDefinition, NodeDefinition};
use crate::validate::{ValidateOptions, ValidationReport};

/// Identifier of a node within its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every configuration.
    pub const ROOT: NodeId = NodeId(0);
}

/// One slot of the node arena.
///
/// Slots are never reused. Replacing a child with `add_child` leaves the
/// old subtree in the arena, detached, so a stale [`NodeId`] can never
/// resolve to a different node. The arena therefore grows by one subtree per
/// replacement; a failed declaration truncates back to where it started.
#[derive(Debug, Clone)]
pub(crate) struct SchemaNode {
    pub(crate) key: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: BTreeMap<String, NodeId>,
    pub(crate) leaves: BTreeMap<String, Leaf>,
    pub(crate) doc: Option<String>,
}

impl SchemaNode {
    pub(crate) fn root() -> Self {
        Self {
            key: String::new(),
            parent: None,
            children: BTreeMap::new(),
            leaves: BTreeMap::new(),
            doc: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Leaf {
    pub(crate) definition: LeafDefinition,
    pub(crate) rule: Rule,
    /// Explicit override; stored raw, already validated.
    pub(crate) assigned: Option<Value>,
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConfigError::Argument(
            "You must provide a property name".to_string(),
        ));
    }
    if name.contains('.') {
        return Err(ConfigError::Argument(format!(
            "Property name \"{name}\" must not contain '.'"
        )));
    }
    Ok(())
}

pub(crate) fn join_path(parent: &str, key: &str) -> String {
    match (parent.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}.{key}"),
    }
}

// Tree bookkeeping and the per-node operations behind the views.
impl Configuration {
    pub(crate) fn data(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    /// Returns `true` if `id` exists and is still reachable from the root.
    pub(crate) fn is_attached(&self, mut id: NodeId) -> bool {
        loop {
            let Some(node) = self.nodes.get(id.0) else {
                return false;
            };
            let Some(parent) = node.parent else {
                return id == NodeId::ROOT;
            };
            if self.data(parent).children.get(&node.key) != Some(&id) {
                return false;
            }
            id = parent;
        }
    }

    /// Keys from the root (exclusive) down to `id` (inclusive).
    pub(crate) fn segments(&self, id: NodeId) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.map(|id| self.data(id)) {
            if node.parent.is_some() {
                segments.push(node.key.as_str());
            }
            current = node.parent;
        }
        segments.reverse();
        segments
    }

    pub(crate) fn path_of(&self, id: NodeId) -> String {
        self.segments(id).join(".")
    }

    pub(crate) fn descend(&self, from: NodeId, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(from);
        }
        path.split('.')
            .try_fold(from, |id, segment| self.data(id).children.get(segment).copied())
    }

    /// Splits a dotted key into its owning node and leaf name.
    fn locate<'k>(&self, from: NodeId, key: &'k str) -> Result<(NodeId, &'k str)> {
        if key.is_empty() {
            return Err(ConfigError::Argument(
                "You must provide a property key".to_string(),
            ));
        }
        let not_defined = || ConfigError::NotDefined(join_path(&self.path_of(from), key));
        let (owner, name) = match key.rsplit_once('.') {
            Some((container, name)) => (self.descend(from, container).ok_or_else(not_defined)?, name),
            None => (from, key),
        };
        if !self.data(owner).leaves.contains_key(name) {
            return Err(not_defined());
        }
        Ok((owner, name))
    }

    fn leaf_at(&self, owner: NodeId, name: &str) -> &Leaf {
        &self.data(owner).leaves[name]
    }

    /// The loaded mapping for a node, if the value store has one.
    pub(crate) fn node_values(&self, id: NodeId) -> Option<&Map<String, Value>> {
        self.segments(id)
            .into_iter()
            .try_fold(&self.values, |map, segment| map.get(segment)?.as_object())
    }

    pub(crate) fn loaded_value(&self, owner: NodeId, name: &str) -> Option<&Value> {
        self.node_values(owner)?.get(name)
    }

    pub(crate) fn define_at(&mut self, id: NodeId, name: &str, def: Definition) -> Result<()> {
        check_name(name)?;
        match def {
            Definition::Leaf(leaf) => self.declare_leaf(id, name, leaf),
            Definition::Node(node) => self.add_child_at(id, name, Some(node)).map(|_| ()),
        }
    }

    fn declare_leaf(&mut self, id: NodeId, name: &str, definition: LeafDefinition) -> Result<()> {
        if self.data(id).children.contains_key(name) {
            return Err(ConfigError::Schema(format!(
                "\"{}\" is already declared as a child node",
                join_path(&self.path_of(id), name)
            )));
        }
        let rule = Rule::compile(&definition.kind, &self.formats)?;
        let path = join_path(&self.path_of(id), name);
        if let Some(default) = &definition.default {
            rule.coerce(&self.formats, Some(default.clone()), &path)?;
        }

        debug!(path = %path, kind = ?definition.kind, "Defined property");
        self.data_mut(id).leaves.insert(
            name.to_string(),
            Leaf {
                definition,
                rule,
                assigned: None,
            },
        );
        Ok(())
    }

    pub(crate) fn add_child_at(
        &mut self,
        parent: NodeId,
        name: &str,
        def: Option<NodeDefinition>,
    ) -> Result<NodeId> {
        check_name(name)?;
        if self.data(parent).leaves.contains_key(name) {
            return Err(ConfigError::Schema(format!(
                "\"{}\" is already declared as a property",
                join_path(&self.path_of(parent), name)
            )));
        }

        let NodeDefinition { doc, properties } = def.unwrap_or_default();
        let mark = self.nodes.len();
        let id = NodeId(mark);
        self.nodes.push(SchemaNode {
            key: name.to_string(),
            parent: Some(parent),
            children: BTreeMap::new(),
            leaves: BTreeMap::new(),
            doc,
        });
        let previous = self.data_mut(parent).children.insert(name.to_string(), id);

        for (key, def) in properties {
            if let Err(err) = self.define_at(id, &key, def) {
                // Nested declarations only touch nodes pushed after `mark`.
                self.nodes.truncate(mark);
                let children = &mut self.data_mut(parent).children;
                match previous {
                    Some(old) => children.insert(name.to_string(), old),
                    None => children.remove(name),
                };
                return Err(err);
            }
        }
        Ok(id)
    }

    fn define_all_at(&mut self, id: NodeId, defs: &Value) -> Result<()> {
        let Value::Object(defs) = defs else {
            return Err(ConfigError::Argument(
                "You must provide an object of definitions".to_string(),
            ));
        };
        for (name, def) in defs {
            let def = Definition::from_value(def)?;
            self.define_at(id, name, def)?;
        }
        Ok(())
    }

    fn resolve_at(&self, id: NodeId, key: &str) -> Result<(NodeId, &Leaf, Option<(Value, ValueSource)>)> {
        let (owner, name) = self.locate(id, key)?;
        let leaf = self.leaf_at(owner, name);
        let raw = pick_raw(
            &leaf.definition,
            leaf.assigned.as_ref(),
            &self.sources,
            self.loaded_value(owner, name),
        );
        Ok((owner, leaf, raw))
    }

    pub(crate) fn get_at(&self, id: NodeId, key: &str, original: bool) -> Result<Option<Value>> {
        let (owner, leaf, raw) = self.resolve_at(id, key)?;
        let raw = raw.map(|(value, _)| value);
        if original {
            return Ok(raw);
        }
        let path = join_path(&self.path_of(owner), leaf_name(key));
        Ok(leaf.rule.coerce(&self.formats, raw, &path)?)
    }

    fn source_at(&self, id: NodeId, key: &str) -> Result<Option<ValueSource>> {
        let (_, _, raw) = self.resolve_at(id, key)?;
        Ok(raw.map(|(_, source)| source))
    }

    fn default_at(&self, id: NodeId, key: &str, parsed: bool) -> Result<Option<Value>> {
        let (owner, name) = self.locate(id, key)?;
        let leaf = self.leaf_at(owner, name);
        let default = leaf.definition.default.clone();
        if !parsed {
            return Ok(default);
        }
        let path = join_path(&self.path_of(owner), name);
        Ok(leaf.rule.coerce(&self.formats, default, &path)?)
    }

    pub(crate) fn has_at(&self, id: NodeId, key: &str) -> bool {
        self.locate(id, key).is_ok()
    }

    pub(crate) fn set_at(&mut self, id: NodeId, key: &str, value: Option<Value>) -> Result<()> {
        let (owner, name) = self.locate(id, key)?;
        let path = join_path(&self.path_of(owner), name);
        if let Some(value) = &value {
            self.leaf_at(owner, name)
                .rule
                .coerce(&self.formats, Some(value.clone()), &path)?;
        }

        match &value {
            Some(value) => debug!(path = %path, value = %value, "Assigned override"),
            None => debug!(path = %path, "Cleared override"),
        }
        if let Some(leaf) = self.data_mut(owner).leaves.get_mut(name) {
            leaf.assigned = value;
        }
        Ok(())
    }

    fn schema_at(&self, id: NodeId) -> Value {
        let node = self.data(id);
        let mut out = Map::new();
        for (name, leaf) in &node.leaves {
            out.insert(name.clone(), leaf.definition.to_schema());
        }
        for (name, child) in &node.children {
            let mut entry = Map::new();
            if let Some(doc) = &self.data(*child).doc {
                entry.insert("doc".into(), Value::String(doc.clone()));
            }
            entry.insert("properties".into(), self.schema_at(*child));
            out.insert(name.clone(), Value::Object(entry));
        }
        Value::Object(out)
    }

    fn to_json_at(&self, id: NodeId) -> Result<Value> {
        let node = self.data(id);
        let mut out = Map::new();
        for (name, child) in &node.children {
            out.insert(name.clone(), self.to_json_at(*child)?);
        }
        for name in node.leaves.keys() {
            if let Some(value) = self.get_at(id, name, false)? {
                out.insert(name.clone(), value);
            }
        }
        Ok(Value::Object(out))
    }
}

fn leaf_name(key: &str) -> &str {
    key.rsplit_once('.').map_or(key, |(_, name)| name)
}

/// Shared view of one node of a [`Configuration`].
///
/// # Examples
///
/// ```
/// use config_schema_core::Configuration;
/// use serde_json::json;
///
/// let mut config = Configuration::empty();
/// config.define_all(&json!({
///     "sub": {"properties": {"inner": {"properties": {"depth": {"format": "int", "default": 3}}}}}
/// })).unwrap();
///
/// let sub = config.get_child("sub").unwrap();
/// assert_eq!(sub.path(), "sub");
/// assert_eq!(sub.get("inner.depth").unwrap(), Some(json!(3)));
///
/// let inner = config.get_child("sub.inner").unwrap();
/// assert_eq!(inner.path(), "sub.inner");
/// assert_eq!(inner.parent().unwrap().key(), "sub");
/// assert!(inner.has("depth"));
/// assert_eq!(inner.has("depth"), config.has("sub.inner.depth"));
/// ```
#[derive(Clone, Copy)]
pub struct Node<'a> {
    config: &'a Configuration,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub(crate) fn new(config: &'a Configuration, id: NodeId) -> Self {
        Self { config, id }
    }

    fn data(&self) -> &'a SchemaNode {
        self.config.data(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Segment name of this node (empty for the root).
    pub fn key(&self) -> &'a str {
        &self.data().key
    }

    /// Dotted path from the root (empty for the root).
    pub fn path(&self) -> String {
        self.config.path_of(self.id)
    }

    pub fn doc(&self) -> Option<&'a str> {
        self.data().doc.as_deref()
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| Node::new(self.config, id))
    }

    pub fn root(&self) -> Node<'a> {
        Node::new(self.config, NodeId::ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.id == NodeId::ROOT
    }

    /// Direct children, ordered by name.
    pub fn children(self) -> impl Iterator<Item = (&'a str, Node<'a>)> + 'a {
        let config = self.config;
        self.data()
            .children
            .iter()
            .map(move |(name, id)| (name.as_str(), Node::new(config, *id)))
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<Node<'a>> {
        self.data()
            .children
            .get(name)
            .map(|id| Node::new(self.config, *id))
    }

    /// Descends a dotted path of child names; `None` if any segment is missing.
    pub fn get_child(&self, path: &str) -> Option<Node<'a>> {
        if path.is_empty() {
            return None;
        }
        self.config
            .descend(self.id, path)
            .map(|id| Node::new(self.config, id))
    }

    /// Declaration of a leaf owned directly by this node.
    pub fn leaf(&self, name: &str) -> Option<&'a LeafDefinition> {
        self.data().leaves.get(name).map(|leaf| &leaf.definition)
    }

    /// Leaves owned directly by this node, ordered by name.
    pub fn leaves(self) -> impl Iterator<Item = (&'a str, &'a LeafDefinition)> + 'a {
        self.data()
            .leaves
            .iter()
            .map(|(name, leaf)| (name.as_str(), &leaf.definition))
    }

    /// Returns `true` if `key` addresses a declared leaf.
    ///
    /// Only tree membership is checked; the value is not resolved.
    pub fn has(&self, key: &str) -> bool {
        self.config.has_at(self.id, key)
    }

    /// Resolves and parses the value of `key`.
    ///
    /// Returns `Ok(None)` when no source provides a value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotDefined`] if the key is not declared,
    /// [`ConfigError::Validation`] if the resolved value is invalid, and
    /// [`ConfigError::Argument`] for an empty key.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.config.get_at(self.id, key, false)
    }

    /// Resolves the raw value of `key` without parsing it.
    pub fn get_original(&self, key: &str) -> Result<Option<Value>> {
        self.config.get_at(self.id, key, true)
    }

    /// Reports which source supplies the value of `key`.
    pub fn source(&self, key: &str) -> Result<Option<ValueSource>> {
        self.config.source_at(self.id, key)
    }

    /// The declared default of `key`, as declared.
    pub fn default(&self, key: &str) -> Result<Option<Value>> {
        self.config.default_at(self.id, key, false)
    }

    /// The declared default of `key`, parsed by its format.
    pub fn default_parsed(&self, key: &str) -> Result<Option<Value>> {
        self.config.default_at(self.id, key, true)
    }

    /// Plain nested description of the declared subtree.
    pub fn get_schema(&self) -> Value {
        self.config.schema_at(self.id)
    }

    /// Resolves every leaf of the subtree into a nested object.
    ///
    /// Leaves without a value are omitted; child nodes always appear.
    pub fn to_json(&self) -> Result<Value> {
        self.config.to_json_at(self.id)
    }

    /// Loaded values for this node, if any were loaded.
    pub fn values(&self) -> Option<&'a Map<String, Value>> {
        self.config.node_values(self.id)
    }

    /// Audits the loaded values of the subtree.
    ///
    /// See [`Configuration::validate`].
    pub fn validate(&self, options: ValidateOptions) -> Result<ValidationReport> {
        self.config.validate_at(self.id, options)
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("path", &self.path())
            .finish()
    }
}

/// Exclusive view of one node, used for declarations and overrides.
pub struct NodeMut<'a> {
    config: &'a mut Configuration,
    id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub(crate) fn new(config: &'a mut Configuration, id: NodeId) -> Self {
        Self { config, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Shared view of the same node.
    pub fn as_node(&self) -> Node<'_> {
        Node::new(self.config, self.id)
    }

    /// Declares a leaf, or a child node when `def` is a [`NodeDefinition`].
    ///
    /// A leaf's format must be registered and its default, if any, must
    /// pass validation. Re-declaring a leaf replaces it and clears its
    /// override.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Argument`] for an empty name or one containing `.`,
    /// [`ConfigError::Schema`] for an unknown format or a name already used
    /// by a child node, [`ConfigError::Validation`] for an invalid default.
    pub fn define(&mut self, name: &str, def: impl Into<Definition>) -> Result<&mut Self> {
        self.config.define_at(self.id, name, def.into())?;
        Ok(self)
    }

    /// Declares every entry of a JSON object, routed by shape.
    ///
    /// See [`Definition::from_value`] for the accepted shapes.
    pub fn define_all(&mut self, defs: &Value) -> Result<&mut Self> {
        self.config.define_all_at(self.id, defs)?;
        Ok(self)
    }

    /// Declares every `(name, definition)` pair.
    pub fn define_many<I, K, D>(&mut self, defs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: Into<Definition>,
    {
        for (name, def) in defs {
            self.config.define_at(self.id, name.as_ref(), def.into())?;
        }
        Ok(self)
    }

    /// Creates a child node, replacing any existing child of that name.
    pub fn add_child(&mut self, name: &str, def: Option<NodeDefinition>) -> Result<NodeMut<'_>> {
        let id = self.config.add_child_at(self.id, name, def)?;
        Ok(NodeMut::new(self.config, id))
    }

    /// Exclusive view of a descendant addressed by a dotted path.
    pub fn child_mut(&mut self, path: &str) -> Option<NodeMut<'_>> {
        if path.is_empty() {
            return None;
        }
        let id = self.config.descend(self.id, path)?;
        Some(NodeMut::new(self.config, id))
    }

    /// Validates `value` against the leaf and stores it as the override.
    ///
    /// The value store is never modified. On failure the previous override
    /// is kept.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.config.set_at(self.id, key, Some(value.into()))?;
        Ok(self)
    }

    /// Clears the override so resolution falls back to the next source.
    pub fn reset(&mut self, key: &str) -> Result<&mut Self> {
        self.config.set_at(self.id, key, None)?;
        Ok(self)
    }
}

impl fmt::Debug for NodeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMut")
            .field("id", &self.id)
            .field("path", &self.config.path_of(self.id))
            .finish()
    }
}
