//! TreeService - Materialized-Path Tree over a NodeStore
//!
//! `TreeService` drives the write and delete stages around every store call,
//! so callers never touch `path` themselves:
//!
//! 1. `save`: [`PathMaintainer::prepare_for_write`] then create/update
//! 2. `remove`: [`DeletionCascade::prepare_for_delete`] then delete by id
//!
//! Queries delegate to [`QueryService`].
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::config::TreeConfig;
//! use pathtree_core::db::MemoryStore;
//! use pathtree_core::models::Node;
//! use pathtree_core::services::TreeService;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let service = TreeService::new(Arc::new(MemoryStore::new()), TreeConfig::default())?;
//!
//! let mut adam = Node::new_with_id("adam".to_string(), "Adam".to_string(), json!({}));
//! service.save(&mut adam).await?;
//!
//! let mut bob = Node::new_with_id("bob".to_string(), "Bob".to_string(), json!({}));
//! bob.set_parent(&adam);
//! service.save(&mut bob).await?;
//!
//! assert_eq!(bob.path.as_deref(), Some("adam#bob"));
//! assert_eq!(service.level(&bob), 2);
//! # Ok(())
//! # }
//! ```

use crate::config::TreeConfig;
use crate::db::NodeStore;
use crate::models::{DeleteResult, Node, NodeFilter, NodeUpdate};
use crate::services::deletion_cascade::DeletionCascade;
use crate::services::error::TreeError;
use crate::services::path_maintainer::{PathMaintainer, WriteOutcome};
use crate::services::query_service::QueryService;
use crate::tree::PathCodec;
use std::sync::Arc;

/// Tree operations over a node collection
///
/// Cheap to clone; all clones share the same store.
///
/// # Concurrency
///
/// No locks are taken. Two concurrent moves in the same subtree, or a move
/// racing a delete of that subtree, can leave paths inconsistent. Callers must
/// serialize structural writes per subtree.
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn NodeStore>,
    config: TreeConfig,
    codec: PathCodec,
    maintainer: PathMaintainer,
    deletion: DeletionCascade,
    queries: QueryService,
}

impl TreeService {
    /// Create a TreeService over an initialized store
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(store: Arc<dyn NodeStore>, config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;

        Ok(Self {
            maintainer: PathMaintainer::new(store.clone(), &config),
            deletion: DeletionCascade::new(store.clone(), &config),
            queries: QueryService::new(store.clone(), &config),
            codec: config.codec(),
            config,
            store,
        })
    }

    /// Access the underlying store
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Codec for this tree's separator
    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Persist a node, maintaining its path and its subtree's paths
    ///
    /// New nodes are created. Persisted nodes are updated with their content
    /// and properties, their parent only if it was reassigned, and their path
    /// only if the maintainer recomputed it; a path held by a stale copy never
    /// overwrites the stored one. On success `node` is replaced by the stored
    /// document and its write-tracking state is cleared.
    ///
    /// # Errors
    ///
    /// Any [`PathMaintainer::prepare_for_write`] error aborts the save before
    /// the node is written. Store failures surface as `TreeError::Store`.
    pub async fn save(&self, node: &mut Node) -> Result<WriteOutcome, TreeError> {
        let outcome = self.maintainer.prepare_for_write(node).await?;
        let path_recomputed = matches!(
            outcome,
            WriteOutcome::Assigned | WriteOutcome::Moved { .. }
        );

        let mut stored = if node.is_new() {
            self.store.create_node(node.clone()).await?
        } else {
            self.store
                .update_node(&node.id, NodeUpdate::from_node(node, path_recomputed))
                .await?
        };

        stored.mark_persisted();
        *node = stored;

        Ok(outcome)
    }

    /// Delete a node together with its entire subtree
    ///
    /// Deleting a node that is no longer stored succeeds with `existed: false`.
    ///
    /// The subtree is located from `node.path` as held by the caller. If the
    /// copy was loaded before one of its ancestors moved, that prefix is stale
    /// and the descendants are left behind; use [`TreeService::remove_by_id`]
    /// to delete from the stored path instead.
    pub async fn remove(&self, node: &Node) -> Result<DeleteResult, TreeError> {
        let descendants_removed = self.deletion.prepare_for_delete(node).await?;

        let removed = self
            .store
            .remove(NodeFilter::new().with_ids(vec![node.id.clone()]))
            .await?;

        tracing::debug!(
            "Removed node {} ({} descendants)",
            node.id,
            descendants_removed
        );

        Ok(DeleteResult {
            existed: removed > 0,
            descendants_removed,
        })
    }

    /// Load and remove a node by id
    pub async fn remove_by_id(&self, id: &str) -> Result<DeleteResult, TreeError> {
        match self.store.get_node(id).await? {
            Some(node) => self.remove(&node).await,
            None => Ok(DeleteResult {
                existed: false,
                descendants_removed: 0,
            }),
        }
    }

    /// Load a node by id, re-parent it (None = make it a root) and save it
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node doesn't exist, plus any `save` error.
    pub async fn move_node(
        &self,
        node_id: &str,
        new_parent: Option<&str>,
    ) -> Result<(Node, WriteOutcome), TreeError> {
        let mut node = self
            .store
            .get_node(node_id)
            .await?
            .ok_or_else(|| TreeError::node_not_found(node_id))?;

        match new_parent {
            Some(parent_id) => node.set_parent(parent_id),
            None => node.clear_parent(),
        }

        let outcome = self.save(&mut node).await?;
        Ok((node, outcome))
    }

    pub async fn get_node(&self, id: &str) -> Result<Option<Node>, TreeError> {
        Ok(self.store.get_node(id).await?)
    }

    /// Direct children, or every descendant when `recursive`
    pub async fn get_children(&self, node: &Node, recursive: bool) -> Result<Vec<Node>, TreeError> {
        self.queries.get_children(node, recursive).await
    }

    pub async fn get_parent(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        self.queries.get_parent(node).await
    }

    pub async fn get_ancestors(&self, node: &Node) -> Result<Vec<Node>, TreeError> {
        self.queries.get_ancestors(node).await
    }

    pub async fn get_root(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        self.queries.get_root(node).await
    }

    pub fn level(&self, node: &Node) -> usize {
        self.queries.level(node)
    }

    pub fn is_descendant_of(&self, node: &Node, ancestor: &Node) -> bool {
        self.queries.is_descendant_of(node, ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn service() -> TreeService {
        TreeService::new(Arc::new(MemoryStore::new()), TreeConfig::default())
            .expect("default config is valid")
    }

    fn named(id: &str) -> Node {
        Node::new_with_id(id.to_string(), id.to_string(), json!({}))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = TreeService::new(
            Arc::new(MemoryStore::new()),
            TreeConfig::default().with_separator(""),
        );
        assert!(matches!(result, Err(TreeError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_save_clears_write_state() -> anyhow::Result<()> {
        let service = service();
        let mut adam = named("adam");

        assert_eq!(service.save(&mut adam).await?, WriteOutcome::Assigned);
        assert!(!adam.is_new());
        assert!(!adam.is_parent_modified());

        adam.set_content("Adam Sr.".to_string());
        assert_eq!(service.save(&mut adam).await?, WriteOutcome::Unchanged);

        let stored = service.get_node("adam").await?.unwrap();
        assert_eq!(stored.content, "Adam Sr.");
        assert_eq!(stored.path.as_deref(), Some("adam"));
        Ok(())
    }

    #[tokio::test]
    async fn test_move_node_by_id() -> anyhow::Result<()> {
        let service = service();
        let mut adam = named("adam");
        service.save(&mut adam).await?;
        let mut bob = named("bob");
        service.save(&mut bob).await?;

        let (bob, outcome) = service.move_node("bob", Some("adam")).await?;
        assert_eq!(bob.path.as_deref(), Some("adam#bob"));
        assert_eq!(
            outcome,
            WriteOutcome::Moved {
                descendants_rewritten: 0
            }
        );

        let err = service.move_node("ghost", None).await.unwrap_err();
        assert!(matches!(err, TreeError::NodeNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_missing_node_succeeds() -> anyhow::Result<()> {
        let service = service();
        let result = service.remove_by_id("ghost").await?;
        assert!(!result.existed);
        assert_eq!(result.descendants_removed, 0);
        Ok(())
    }
}
