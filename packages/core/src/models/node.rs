//! Node Data Structures
//!
//! This module defines the `Node` document stored in the flat collection and
//! the supporting query/update types used by every `NodeStore` backend.
//!
//! # Architecture
//!
//! - **Flat collection**: every node is one document; hierarchy lives in fields
//! - **Parent reference**: `parent_id` points at the immediate parent (None = root)
//! - **Materialized path**: `path` is the ancestor chain plus the node's own id,
//!   joined by the configured separator, owned by the path maintainer
//! - **Write tracking**: a node remembers whether it is new and whether its parent
//!   changed, so the pre-write stage knows when a path must be recomputed
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::models::Node;
//! use serde_json::json;
//!
//! let root = Node::new("Adam".to_string(), json!({}));
//!
//! let mut child = Node::new("Bob".to_string(), json!({ "age": 30 }));
//! child.set_parent(&root);
//!
//! assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
//! assert!(child.is_new());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Node operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),
}

/// Write-tracking flags, never persisted.
///
/// Nodes deserialized from a store start clean; nodes built with `Node::new*`
/// start as new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WriteState {
    is_new: bool,
    parent_modified: bool,
}

/// A document in the tree collection.
///
/// # Fields
///
/// - `id`: Unique identifier, fixed when the node value is constructed
/// - `parent_id`: Optional reference to the parent node (None means root)
/// - `path`: Materialized ancestor chain ending with this node's id (None before first save)
/// - `content`: Primary content/text of the node
/// - `properties`: JSON object with application-specific fields
/// - `created_at` / `modified_at`: Timestamps
///
/// `path` must only be written by the path maintainer; callers change structure
/// through [`Node::set_parent`] and [`Node::clear_parent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier (UUID unless supplied through `new_with_id`)
    pub id: String,

    /// Parent node ID (None for roots)
    pub parent_id: Option<String>,

    /// Materialized path, e.g. `root#child#self`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Primary content/text of the node
    pub content: String,

    /// Application-specific fields
    pub properties: serde_json::Value,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,

    #[serde(skip)]
    state: WriteState,
}

/// Equality is over persisted fields only; write-tracking state is ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.parent_id == other.parent_id
            && self.path == other.path
            && self.content == other.content
            && self.properties == other.properties
            && self.created_at == other.created_at
            && self.modified_at == other.modified_at
    }
}

/// Parent assignment accepted by [`Node::set_parent`].
///
/// A parent may be given either as a raw identifier or as a loaded node; in
/// both cases only the identifier is kept.
#[derive(Debug, Clone, Copy)]
pub enum ParentRef<'a> {
    Id(&'a str),
    Node(&'a Node),
}

impl<'a> ParentRef<'a> {
    /// The identifier this reference resolves to
    pub fn id(&self) -> &'a str {
        match self {
            ParentRef::Id(id) => id,
            ParentRef::Node(node) => &node.id,
        }
    }
}

impl<'a> From<&'a str> for ParentRef<'a> {
    fn from(id: &'a str) -> Self {
        ParentRef::Id(id)
    }
}

impl<'a> From<&'a String> for ParentRef<'a> {
    fn from(id: &'a String) -> Self {
        ParentRef::Id(id.as_str())
    }
}

impl<'a> From<&'a Node> for ParentRef<'a> {
    fn from(node: &'a Node) -> Self {
        ParentRef::Node(node)
    }
}

impl Node {
    /// Create a new root Node with auto-generated UUID
    ///
    /// Use [`Node::set_parent`] afterwards to place it under another node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use pathtree_core::models::Node;
    /// # use serde_json::json;
    /// let node = Node::new("Hello World".to_string(), json!({}));
    /// assert!(node.parent_id.is_none());
    /// assert!(node.path.is_none());
    /// ```
    pub fn new(content: String, properties: serde_json::Value) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), content, properties)
    }

    /// Create a new root Node with a caller-supplied ID
    ///
    /// The ID must not contain the configured path separator; this is checked
    /// when the node is first saved.
    pub fn new_with_id(id: String, content: String, properties: serde_json::Value) -> Self {
        let now = Utc::now();

        Self {
            id,
            parent_id: None,
            path: None,
            content,
            properties,
            created_at: now,
            modified_at: now,
            state: WriteState {
                is_new: true,
                parent_modified: false,
            },
        }
    }

    /// Assign a parent, from either an ID or a loaded node
    ///
    /// Marks the parent as modified only when the stored identifier changes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use pathtree_core::models::Node;
    /// # use serde_json::json;
    /// let parent = Node::new("Parent".to_string(), json!({}));
    /// let mut child = Node::new("Child".to_string(), json!({}));
    ///
    /// child.set_parent(&parent);
    /// assert_eq!(child.parent_id, Some(parent.id.clone()));
    ///
    /// child.set_parent(parent.id.as_str());
    /// assert_eq!(child.parent_id, Some(parent.id.clone()));
    /// ```
    pub fn set_parent<'a>(&mut self, parent: impl Into<ParentRef<'a>>) {
        let parent_id = parent.into().id();
        if self.parent_id.as_deref() != Some(parent_id) {
            self.parent_id = Some(parent_id.to_string());
            self.state.parent_modified = true;
            self.modified_at = Utc::now();
        }
    }

    /// Detach from the current parent, making this node a root
    pub fn clear_parent(&mut self) {
        if self.parent_id.take().is_some() {
            self.state.parent_modified = true;
            self.modified_at = Utc::now();
        }
    }

    /// Whether this node has never been written to a store
    pub fn is_new(&self) -> bool {
        self.state.is_new
    }

    /// Whether the parent reference changed since the node was last persisted
    pub fn is_parent_modified(&self) -> bool {
        self.state.parent_modified
    }

    /// Clear write-tracking state after a successful store write
    pub fn mark_persisted(&mut self) {
        self.state = WriteState::default();
    }

    /// Check if this node is a root node (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Update the node's content
    ///
    /// Content changes never trigger path recomputation.
    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.modified_at = Utc::now();
    }

    /// Merge properties with existing properties (shallow merge)
    pub fn merge_properties(&mut self, updates: serde_json::Value) {
        if let (Some(existing), Some(new)) = (self.properties.as_object_mut(), updates.as_object())
        {
            for (key, value) in new {
                existing.insert(key.clone(), value.clone());
            }
            self.modified_at = Utc::now();
        }
    }

    /// Validate node structure and required fields
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - `properties` is not a JSON object
    /// - Node references itself as parent
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if !self.properties.is_object() {
            return Err(ValidationError::InvalidProperties(
                "properties must be a JSON object".to_string(),
            ));
        }

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(ValidationError::InvalidParent(
                "Node cannot be its own parent".to_string(),
            ));
        }

        Ok(())
    }
}

/// Custom deserializer mapping an explicit `null` to `Some(None)`
///
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update
///
/// Only provided fields are written. `parent_id` uses the double-Option pattern:
///
/// - `None`: Don't change this field
/// - `Some(None)`: Set the field to NULL
/// - `Some(Some(value))`: Set the field to the specified value
///
/// The descendant cascade uses [`NodeUpdate::path_only`] so that rewriting a
/// descendant touches nothing but its path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct path rewrite, used for descendants during a move
    pub fn path_only(path: String) -> Self {
        Self {
            path: Some(path),
            ..Default::default()
        }
    }

    /// Write of an already-persisted node's caller-owned fields
    ///
    /// `parent_id` is included only when it changed since the node was loaded,
    /// and `path` only when `include_path` is set (the maintainer just
    /// recomputed it). A stale in-memory path is never written back.
    pub fn from_node(node: &Node, include_path: bool) -> Self {
        Self {
            parent_id: node
                .is_parent_modified()
                .then(|| node.parent_id.clone()),
            path: if include_path { node.path.clone() } else { None },
            content: Some(node.content.clone()),
            properties: Some(node.properties.clone()),
        }
    }

    /// Apply this update to a node in place (used by stores that hold whole documents)
    pub fn apply_to(self, node: &mut Node) {
        if let Some(parent_id) = self.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(path) = self.path {
            node.path = Some(path);
        }
        if let Some(content) = self.content {
            node.content = content;
        }
        if let Some(properties) = self.properties {
            node.properties = properties;
        }
        node.modified_at = Utc::now();
    }
}

/// Result of a delete operation
///
/// Deleting a node that does not exist succeeds; `existed` records whether it
/// did, and `descendants_removed` how many subtree records went with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    /// Whether the node existed before deletion
    pub existed: bool,

    /// Number of descendants removed by the subtree cascade
    pub descendants_removed: u64,
}

/// Query filter for node stores
///
/// All set fields are combined with AND logic; `None` fields are ignored, so an
/// empty filter matches every node.
///
/// # Examples
///
/// ```rust
/// # use pathtree_core::models::NodeFilter;
/// // Immediate children of a node
/// let children = NodeFilter::new().with_parent_id("adam".to_string());
///
/// // Every descendant, at any depth
/// let subtree = NodeFilter::new().with_path_prefix("adam#".to_string());
///
/// // Batched multi-get
/// let ancestors = NodeFilter::new().with_ids(vec!["adam".to_string(), "carol".to_string()]);
/// # assert!(!children.is_empty() && !subtree.is_empty() && !ancestors.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    /// Filter by specific IDs (set membership)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    /// Filter by parent ID (equality)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Filter by path prefix (starts-with)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Filter for root nodes only (or non-roots when false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,

    /// Limit number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl NodeFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by specific IDs
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Filter by parent ID
    pub fn with_parent_id(mut self, parent_id: String) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Filter by path prefix
    pub fn with_path_prefix(mut self, prefix: String) -> Self {
        self.path_prefix = Some(prefix);
        self
    }

    /// Filter for root nodes only
    pub fn with_is_root(mut self, is_root: bool) -> Self {
        self.is_root = Some(is_root);
        self
    }

    /// Set result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when no predicate is set (limit alone does not count)
    pub fn is_empty(&self) -> bool {
        self.ids.is_none()
            && self.parent_id.is_none()
            && self.path_prefix.is_none()
            && self.is_root.is_none()
    }

    /// Evaluate the predicates against a node
    ///
    /// Backends that cannot push a predicate down use this to post-filter.
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &node.id) {
                return false;
            }
        }

        if let Some(parent_id) = &self.parent_id {
            if node.parent_id.as_ref() != Some(parent_id) {
                return false;
            }
        }

        if let Some(prefix) = &self.path_prefix {
            match &node.path {
                Some(path) if path.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }

        if let Some(is_root) = self.is_root {
            if node.is_root() != is_root {
                return false;
            }
        }

        true
    }
}
