//! NodeStore Trait - Document Store Abstraction
//!
//! This module defines the `NodeStore` trait, the only thing the tree services
//! require from the underlying document collection. Two backends ship with the
//! crate:
//!
//! - [`MemoryStore`](crate::db::MemoryStore): in-process, indexed by path and parent
//! - [`TursoStore`](crate::db::TursoStore): embedded libsql database
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked backends
//!    fit behind the same trait
//! 2. **Streaming Reads**: `find` returns a lazy stream so the move cascade can
//!    walk arbitrarily large subtrees without materializing them
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context; the
//!    service layer wraps failures in `TreeError`
//! 4. **No Transactions**: Each call stands alone; the tree services never hold
//!    locks across calls
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::db::{MemoryStore, NodeStore};
//! use pathtree_core::models::{Node, NodeFilter};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//!
//! let node = Node::new("My note".to_string(), json!({}));
//! let created = store.create_node(node).await?;
//!
//! let roots = store.query_nodes(NodeFilter::new().with_is_root(true)).await?;
//! assert_eq!(roots.len(), 1);
//! # let _ = created;
//! # Ok(())
//! # }
//! ```

use crate::models::{Node, NodeFilter, NodeUpdate};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;

/// Lazy sequence of nodes produced by [`NodeStore::find`]
///
/// Finite and not restartable; dropping it abandons the remaining results.
pub type NodeStream = BoxStream<'static, Result<Node>>;

/// Persistence operations for tree nodes
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
///
/// # Index Requirements
///
/// `find` and `remove` are expected to serve `path_prefix` as a range scan over
/// an index on `path`, and `parent_id` through an index on the parent field.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert a new node
    ///
    /// # Errors
    ///
    /// Returns error if a node with the same ID already exists.
    async fn create_node(&self, node: Node) -> Result<Node>;

    /// Get node by ID
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    /// - `Err(_)` if the store fails
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    /// Stream every node matching the filter
    ///
    /// Results are ordered by path. The stream owns everything it needs, so
    /// callers may write to the store while pulling from it.
    async fn find(&self, filter: NodeFilter) -> Result<NodeStream>;

    /// Apply a sparse update to a node
    ///
    /// Returns the node as stored after the update.
    ///
    /// # Errors
    ///
    /// Returns error if the node doesn't exist.
    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node>;

    /// Bulk delete every node matching the filter
    ///
    /// Returns the number of removed nodes.
    ///
    /// # Errors
    ///
    /// Returns error for an empty filter rather than clearing the collection.
    async fn remove(&self, filter: NodeFilter) -> Result<u64>;

    /// Release backend resources
    async fn close(&self) -> Result<()>;

    /// Collect `find` results into a vector
    async fn query_nodes(&self, filter: NodeFilter) -> Result<Vec<Node>> {
        self.find(filter).await?.try_collect().await
    }

    /// First node matching the filter, if any
    async fn find_one(&self, filter: NodeFilter) -> Result<Option<Node>> {
        self.find(filter.with_limit(1)).await?.try_next().await
    }
}
