//! MemoryStore - In-Process NodeStore Implementation
//!
//! Keeps documents in a `HashMap` keyed by id, with two secondary indexes:
//!
//! - `by_path`: `BTreeMap<path, id>`, so a path prefix is a range scan
//! - `by_parent`: parent id to the set of child ids
//!
//! `find` snapshots the matching documents under a short read lock and hands
//! back an owned stream, so the move cascade can write while it iterates.

use crate::db::node_store::{NodeStream, NodeStore};
use crate::models::{Node, NodeFilter, NodeUpdate};
use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    nodes: HashMap<String, Node>,
    by_path: BTreeMap<String, String>,
    by_parent: HashMap<String, BTreeSet<String>>,
}

impl MemoryState {
    fn index(&mut self, node: &Node) {
        if let Some(path) = &node.path {
            self.by_path.insert(path.clone(), node.id.clone());
        }
        if let Some(parent_id) = &node.parent_id {
            self.by_parent
                .entry(parent_id.clone())
                .or_default()
                .insert(node.id.clone());
        }
    }

    fn unindex(&mut self, node: &Node) {
        if let Some(path) = &node.path {
            if self.by_path.get(path) == Some(&node.id) {
                self.by_path.remove(path);
            }
        }
        if let Some(parent_id) = &node.parent_id {
            if let Some(children) = self.by_parent.get_mut(parent_id) {
                children.remove(&node.id);
                if children.is_empty() {
                    self.by_parent.remove(parent_id);
                }
            }
        }
    }

    /// Candidate ids for a filter, using the most selective index available
    fn candidates(&self, filter: &NodeFilter) -> Vec<String> {
        if let Some(ids) = &filter.ids {
            return ids
                .iter()
                .filter(|id| self.nodes.contains_key(id.as_str()))
                .cloned()
                .collect();
        }

        if let Some(prefix) = &filter.path_prefix {
            return self
                .by_path
                .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                .take_while(|(path, _)| path.starts_with(prefix.as_str()))
                .map(|(_, id)| id.clone())
                .collect();
        }

        if let Some(parent_id) = &filter.parent_id {
            return self
                .by_parent
                .get(parent_id)
                .map(|children| children.iter().cloned().collect())
                .unwrap_or_default();
        }

        self.nodes.keys().cloned().collect()
    }

    fn select(&self, filter: &NodeFilter) -> Vec<Node> {
        let mut selected: Vec<Node> = self
            .candidates(filter)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .filter(|node| filter.matches(node))
            .cloned()
            .collect();

        selected.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
        selected.dedup_by(|a, b| a.id == b.id);

        if let Some(limit) = filter.limit {
            selected.truncate(limit);
        }

        selected
    }
}

/// In-memory `NodeStore` with path and parent indexes
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    pub async fn len(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    /// Whether the store holds no nodes
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.nodes.is_empty()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn create_node(&self, node: Node) -> Result<Node> {
        let mut state = self.state.write().await;

        if state.nodes.contains_key(&node.id) {
            bail!("Node already exists: {}", node.id);
        }

        let mut stored = node;
        stored.mark_persisted();
        state.index(&stored);
        state.nodes.insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.state.read().await.nodes.get(id).cloned())
    }

    async fn find(&self, filter: NodeFilter) -> Result<NodeStream> {
        let selected = self.state.read().await.select(&filter);
        Ok(futures::stream::iter(selected.into_iter().map(Ok)).boxed())
    }

    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node> {
        let mut state = self.state.write().await;

        let Some(mut node) = state.nodes.remove(id) else {
            bail!("Node not found: {}", id);
        };

        state.unindex(&node);
        update.apply_to(&mut node);
        state.index(&node);
        state.nodes.insert(node.id.clone(), node.clone());

        Ok(node)
    }

    async fn remove(&self, filter: NodeFilter) -> Result<u64> {
        if filter.is_empty() {
            bail!("Refusing to remove with an empty filter");
        }

        let mut state = self.state.write().await;
        let doomed = state.select(&filter);

        for node in &doomed {
            state.unindex(node);
            state.nodes.remove(&node.id);
        }

        Ok(doomed.len() as u64)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn node_at(id: &str, parent: Option<&str>, path: &str) -> Node {
        let mut node = Node::new_with_id(id.to_string(), id.to_string(), json!({}));
        if let Some(parent) = parent {
            node.set_parent(parent);
        }
        node.path = Some(path.to_string());
        node
    }

    async fn seeded_store() -> Result<MemoryStore> {
        let store = MemoryStore::new();
        store.create_node(node_at("a", None, "a")).await?;
        store.create_node(node_at("b", Some("a"), "a#b")).await?;
        store.create_node(node_at("c", Some("b"), "a#b#c")).await?;
        store.create_node(node_at("ab", None, "ab")).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_create_and_get_node() -> Result<()> {
        let store = MemoryStore::new();
        let created = store.create_node(node_at("a", None, "a")).await?;
        assert!(!created.is_new());

        let fetched = store.get_node("a").await?;
        assert_eq!(fetched, Some(created));
        assert!(store.get_node("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() -> Result<()> {
        let store = MemoryStore::new();
        store.create_node(node_at("a", None, "a")).await?;
        assert!(store.create_node(node_at("a", None, "a")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_scan_respects_boundary() -> Result<()> {
        let store = seeded_store().await?;

        let ids: Vec<String> = store
            .find(NodeFilter::new().with_path_prefix("a#".to_string()))
            .await?
            .map_ok(|n| n.id)
            .try_collect()
            .await?;

        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_and_id_filters() -> Result<()> {
        let store = seeded_store().await?;

        let children = store
            .query_nodes(NodeFilter::new().with_parent_id("a".to_string()))
            .await?;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "b");

        let picked = store
            .query_nodes(NodeFilter::new().with_ids(vec![
                "c".to_string(),
                "a".to_string(),
                "zzz".to_string(),
            ]))
            .await?;
        let ids: Vec<&str> = picked.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let roots = store.query_nodes(NodeFilter::new().with_is_root(true)).await?;
        assert_eq!(roots.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_reindexes_path() -> Result<()> {
        let store = seeded_store().await?;

        store
            .update_node("c", NodeUpdate::path_only("ab#c".to_string()))
            .await?;

        let under_a = store
            .query_nodes(NodeFilter::new().with_path_prefix("a#".to_string()))
            .await?;
        assert_eq!(under_a.len(), 1);

        let under_ab = store
            .query_nodes(NodeFilter::new().with_path_prefix("ab#".to_string()))
            .await?;
        assert_eq!(under_ab.len(), 1);
        assert_eq!(under_ab[0].id, "c");
        assert_eq!(under_ab[0].parent_id.as_deref(), Some("b"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_node_fails() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store
            .update_node("missing", NodeUpdate::path_only("x".to_string()))
            .await
            .is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_by_prefix() -> Result<()> {
        let store = seeded_store().await?;

        let removed = store
            .remove(NodeFilter::new().with_path_prefix("a#".to_string()))
            .await?;
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 2);
        assert!(store
            .query_nodes(NodeFilter::new().with_parent_id("a".to_string()))
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_refuses_empty_filter() -> Result<()> {
        let store = seeded_store().await?;
        assert!(store.remove(NodeFilter::new()).await.is_err());
        assert_eq!(store.len().await, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_one_and_limit() -> Result<()> {
        let store = seeded_store().await?;

        let first = store
            .find_one(NodeFilter::new().with_path_prefix("a".to_string()))
            .await?;
        assert_eq!(first.map(|n| n.id), Some("a".to_string()));

        let limited = store.query_nodes(NodeFilter::new().with_limit(2)).await?;
        assert_eq!(limited.len(), 2);
        Ok(())
    }
}
