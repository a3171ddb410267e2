//! Path Maintainer
//!
//! Computes a node's materialized path before the node is written, and keeps
//! the subtree consistent when a persisted node changes parent.
//!
//! # Move Cascade
//!
//! When a persisted node is re-parented (or detached to a root), every
//! descendant's path starts with the node's *previous* path plus the
//! separator. The maintainer captures that previous path, streams the
//! descendants through [`NodeStore::find`], and rewrites each one with a
//! path-only update:
//!
//! ```text
//! move carol under bob:
//!   adam#carol            -> adam#bob#carol     (the node itself)
//!   adam#carol#dann       -> adam#bob#carol#dann
//!   adam#carol#dann#emily -> adam#bob#carol#dann#emily
//! ```
//!
//! Descendant updates never re-enter the maintainer. There is no rollback: a
//! failure part-way reports how many descendants were already rewritten.

use crate::config::TreeConfig;
use crate::db::NodeStore;
use crate::models::{Node, NodeFilter, NodeUpdate};
use crate::services::error::TreeError;
use crate::tree::PathCodec;
use anyhow::Context;
use futures::TryStreamExt;
use std::sync::Arc;

/// What `prepare_for_write` did to the node's path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Path left as it was (no structural change, or same path recomputed)
    Unchanged,

    /// Path assigned for the first time
    Assigned,

    /// Persisted node moved; its descendants were rewritten
    Moved { descendants_rewritten: u64 },
}

/// Pre-write stage owning the `path` field
#[derive(Clone)]
pub struct PathMaintainer {
    store: Arc<dyn NodeStore>,
    codec: PathCodec,
    reject_cycles: bool,
}

impl PathMaintainer {
    pub fn new(store: Arc<dyn NodeStore>, config: &TreeConfig) -> Self {
        Self {
            store,
            codec: config.codec(),
            reject_cycles: config.reject_cycles,
        }
    }

    /// Recompute `node.path` if the node is new or its parent changed
    ///
    /// Performs no I/O when the node needs no recomputation, or when it is a
    /// new root. On error the node's `path` is left untouched.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if the id contains the separator
    /// - `ValidationFailed` if `Node::validate` fails
    /// - `ParentNotFound` / `ParentPathMissing` for an unusable parent
    /// - `CircularReference` when moving a node under its own subtree
    /// - `Store` if the parent lookup fails
    /// - `Cascade` if rewriting descendants fails part-way
    pub async fn prepare_for_write(&self, node: &mut Node) -> Result<WriteOutcome, TreeError> {
        if !node.is_new() && !node.is_parent_modified() {
            return Ok(WriteOutcome::Unchanged);
        }

        if self.codec.contains_separator(&node.id) {
            return Err(TreeError::invalid_identifier(
                node.id.clone(),
                self.codec.separator(),
            ));
        }
        node.validate()?;

        let new_path = match node.parent_id.as_deref() {
            None => node.id.clone(),
            Some(parent_id) => {
                let parent = self
                    .store
                    .get_node(parent_id)
                    .await?
                    .ok_or_else(|| TreeError::parent_not_found(parent_id))?;

                let parent_path = parent
                    .path
                    .as_deref()
                    .ok_or_else(|| TreeError::parent_path_missing(parent_id))?;

                if self.reject_cycles && !node.is_new() {
                    if let Some(current) = node.path.as_deref() {
                        if self.codec.is_ancestor_path(current, parent_path) {
                            return Err(TreeError::circular_reference(node.id.clone(), parent_id));
                        }
                    }
                }

                self.codec.encode_child(parent_path, &node.id)
            }
        };

        if node.is_new() {
            tracing::debug!("Assigned path '{}' to new node {}", new_path, node.id);
            node.path = Some(new_path);
            return Ok(WriteOutcome::Assigned);
        }

        let outcome = match node.path.as_deref() {
            None => WriteOutcome::Assigned,
            Some(previous) if previous == new_path => WriteOutcome::Unchanged,
            Some(previous) => {
                let rewritten = self.rewrite_descendants(&node.id, previous, &new_path).await?;
                tracing::info!(
                    "Moved node {} from '{}' to '{}' ({} descendants rewritten)",
                    node.id,
                    previous,
                    new_path,
                    rewritten
                );
                WriteOutcome::Moved {
                    descendants_rewritten: rewritten,
                }
            }
        };

        node.path = Some(new_path);
        Ok(outcome)
    }

    /// Rebase every descendant of `previous_path` onto `new_path`
    async fn rewrite_descendants(
        &self,
        node_id: &str,
        previous_path: &str,
        new_path: &str,
    ) -> Result<u64, TreeError> {
        let prefix = self.codec.subtree_prefix(previous_path);
        let mut rewritten: u64 = 0;

        let result: anyhow::Result<()> = async {
            let mut descendants = self
                .store
                .find(NodeFilter::new().with_path_prefix(prefix))
                .await
                .context("Failed to open descendant stream")?;

            while let Some(descendant) = descendants.try_next().await? {
                let Some(path) = descendant
                    .path
                    .as_deref()
                    .and_then(|p| self.codec.rebase(p, previous_path, new_path))
                else {
                    continue;
                };

                tracing::debug!("Rewriting descendant {} to '{}'", descendant.id, path);

                self.store
                    .update_node(&descendant.id, NodeUpdate::path_only(path))
                    .await
                    .with_context(|| format!("Failed to rewrite descendant {}", descendant.id))?;
                rewritten += 1;
            }

            Ok(())
        }
        .await;

        match result {
            Ok(()) => Ok(rewritten),
            Err(e) => {
                tracing::warn!(
                    "Path cascade for node {} aborted after {} descendants: {}",
                    node_id,
                    rewritten,
                    e
                );
                Err(TreeError::cascade(node_id, rewritten, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn maintainer() -> (PathMaintainer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let maintainer = PathMaintainer::new(store.clone(), &TreeConfig::default());
        (maintainer, store)
    }

    fn named(id: &str) -> Node {
        Node::new_with_id(id.to_string(), id.to_string(), json!({}))
    }

    async fn persist(
        maintainer: &PathMaintainer,
        store: &MemoryStore,
        mut node: Node,
    ) -> anyhow::Result<Node> {
        maintainer.prepare_for_write(&mut node).await?;
        Ok(store.create_node(node).await?)
    }

    #[tokio::test]
    async fn test_new_root_gets_own_id() -> anyhow::Result<()> {
        let (maintainer, _store) = maintainer();
        let mut adam = named("adam");

        let outcome = maintainer.prepare_for_write(&mut adam).await?;
        assert_eq!(outcome, WriteOutcome::Assigned);
        assert_eq!(adam.path.as_deref(), Some("adam"));
        Ok(())
    }

    #[tokio::test]
    async fn test_child_extends_parent_path() -> anyhow::Result<()> {
        let (maintainer, store) = maintainer();
        let adam = persist(&maintainer, &store, named("adam")).await?;

        let mut bob = named("bob");
        bob.set_parent(&adam);
        maintainer.prepare_for_write(&mut bob).await?;
        assert_eq!(bob.path.as_deref(), Some("adam#bob"));
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_node_is_untouched() -> anyhow::Result<()> {
        let (maintainer, store) = maintainer();
        let mut adam = persist(&maintainer, &store, named("adam")).await?;

        adam.set_content("renamed".to_string());
        adam.path = Some("tampered".to_string());

        let outcome = maintainer.prepare_for_write(&mut adam).await?;
        assert_eq!(outcome, WriteOutcome::Unchanged);
        assert_eq!(adam.path.as_deref(), Some("tampered"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_parent_leaves_path_alone() -> anyhow::Result<()> {
        let (maintainer, _store) = maintainer();
        let mut orphan = named("orphan");
        orphan.set_parent("ghost");

        let err = maintainer.prepare_for_write(&mut orphan).await.unwrap_err();
        assert!(matches!(err, TreeError::ParentNotFound { ref parent_id } if parent_id == "ghost"));
        assert!(orphan.path.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_without_path_is_rejected() -> anyhow::Result<()> {
        let (maintainer, store) = maintainer();
        store.create_node(named("pathless")).await?;

        let mut child = named("child");
        child.set_parent("pathless");

        let err = maintainer.prepare_for_write(&mut child).await.unwrap_err();
        assert!(matches!(err, TreeError::ParentPathMissing { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_separator_in_id_is_rejected() -> anyhow::Result<()> {
        let (maintainer, _store) = maintainer();
        let mut bad = named("a#b");

        let err = maintainer.prepare_for_write(&mut bad).await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidIdentifier { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_move_rewrites_descendants() -> anyhow::Result<()> {
        let (maintainer, store) = maintainer();
        let adam = persist(&maintainer, &store, named("adam")).await?;
        let mut carol = named("carol");
        carol.set_parent(&adam);
        let mut carol = persist(&maintainer, &store, carol).await?;
        let mut dann = named("dann");
        dann.set_parent(&carol);
        persist(&maintainer, &store, dann).await?;
        let zed = persist(&maintainer, &store, named("zed")).await?;

        carol.set_parent(&zed);
        let outcome = maintainer.prepare_for_write(&mut carol).await?;

        assert_eq!(
            outcome,
            WriteOutcome::Moved {
                descendants_rewritten: 1
            }
        );
        assert_eq!(carol.path.as_deref(), Some("zed#carol"));
        let dann = store.get_node("dann").await?.unwrap();
        assert_eq!(dann.path.as_deref(), Some("zed#carol#dann"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cycle_rejected_without_writes() -> anyhow::Result<()> {
        let (maintainer, store) = maintainer();
        let mut adam = persist(&maintainer, &store, named("adam")).await?;
        let mut bob = named("bob");
        bob.set_parent(&adam);
        persist(&maintainer, &store, bob).await?;

        adam.set_parent("bob");
        let err = maintainer.prepare_for_write(&mut adam).await.unwrap_err();

        assert!(matches!(err, TreeError::CircularReference { .. }));
        assert_eq!(adam.path.as_deref(), Some("adam"));
        let bob = store.get_node("bob").await?.unwrap();
        assert_eq!(bob.path.as_deref(), Some("adam#bob"));
        Ok(())
    }
}
