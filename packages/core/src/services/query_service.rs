//! Tree Queries
//!
//! Read-only navigation derived from `parent_id` and `path`. Every query is a
//! single store call (or none), never a per-level walk:
//!
//! | Query              | Store call                                  |
//! |--------------------|---------------------------------------------|
//! | children           | `find(parent_id == node.id)`                |
//! | all descendants    | `find(path_prefix == node.path + sep)`      |
//! | parent             | `get_node(node.parent_id)`                  |
//! | ancestors          | `find(ids in ancestor_ids(node.path))`      |
//! | level              | none                                        |

use crate::config::TreeConfig;
use crate::db::NodeStore;
use crate::models::{Node, NodeFilter};
use crate::services::error::TreeError;
use crate::tree::PathCodec;
use std::sync::Arc;

/// Hierarchy queries over a node store
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn NodeStore>,
    codec: PathCodec,
}

impl QueryService {
    pub fn new(store: Arc<dyn NodeStore>, config: &TreeConfig) -> Self {
        Self {
            store,
            codec: config.codec(),
        }
    }

    /// Direct children, or every descendant when `recursive`
    ///
    /// Results come back in path order. A node that has never been saved has
    /// no recursive descendants.
    pub async fn get_children(&self, node: &Node, recursive: bool) -> Result<Vec<Node>, TreeError> {
        let filter = if recursive {
            let Some(path) = node.path.as_deref() else {
                return Ok(Vec::new());
            };
            NodeFilter::new().with_path_prefix(self.codec.subtree_prefix(path))
        } else {
            NodeFilter::new().with_parent_id(node.id.clone())
        };

        Ok(self.store.query_nodes(filter).await?)
    }

    /// The parent document, or `None` for roots and dangling references
    pub async fn get_parent(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        match node.parent_id.as_deref() {
            Some(parent_id) => Ok(self.store.get_node(parent_id).await?),
            None => Ok(None),
        }
    }

    /// Every ancestor in one batched lookup
    ///
    /// Empty (and no store call) for roots and nodes without a path.
    pub async fn get_ancestors(&self, node: &Node) -> Result<Vec<Node>, TreeError> {
        let ids = self.codec.ancestor_ids(node.path.as_deref());
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.into_iter().map(str::to_string).collect();
        Ok(self.store.query_nodes(NodeFilter::new().with_ids(ids)).await?)
    }

    /// Depth of the node: 1 for a root, 0 when it has no path yet
    pub fn level(&self, node: &Node) -> usize {
        self.codec.depth(node.path.as_deref())
    }

    /// Root of the node's tree
    ///
    /// A root returns itself; a node without a path returns `None`.
    pub async fn get_root(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        let Some(path) = node.path.as_deref() else {
            return Ok(None);
        };

        match self.codec.ancestor_ids(Some(path)).first() {
            Some(root_id) => Ok(self.store.get_node(root_id).await?),
            None => Ok(Some(node.clone())),
        }
    }

    /// Whether `node` lies strictly inside `ancestor`'s subtree
    pub fn is_descendant_of(&self, node: &Node, ancestor: &Node) -> bool {
        match (node.path.as_deref(), ancestor.path.as_deref()) {
            (Some(path), Some(ancestor_path)) => self.codec.is_ancestor_path(ancestor_path, path),
            _ => false,
        }
    }
}
