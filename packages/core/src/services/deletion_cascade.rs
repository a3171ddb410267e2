//! Deletion Cascade
//!
//! Removes a node's whole subtree with one bulk prefix delete before the node
//! itself is removed. Descendants are not visited one by one, so no per-node
//! pre-delete stage runs for them.

use crate::config::TreeConfig;
use crate::db::NodeStore;
use crate::models::{Node, NodeFilter};
use crate::services::error::TreeError;
use crate::tree::PathCodec;
use std::sync::Arc;

#[derive(Clone)]
pub struct DeletionCascade {
    store: Arc<dyn NodeStore>,
    codec: PathCodec,
}

impl DeletionCascade {
    pub fn new(store: Arc<dyn NodeStore>, config: &TreeConfig) -> Self {
        Self {
            store,
            codec: config.codec(),
        }
    }

    /// Remove every strict descendant of `node`, returning how many were removed
    ///
    /// A node without a path has no descendants and issues no store call.
    pub async fn prepare_for_delete(&self, node: &Node) -> Result<u64, TreeError> {
        let Some(path) = node.path.as_deref() else {
            return Ok(0);
        };

        let prefix = self.codec.subtree_prefix(path);
        let removed = self
            .store
            .remove(NodeFilter::new().with_path_prefix(prefix))
            .await?;

        if removed > 0 {
            tracing::info!("Removed {} descendants of node {}", removed, node.id);
        }

        Ok(removed)
    }
}
