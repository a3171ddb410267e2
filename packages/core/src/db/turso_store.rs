//! TursoStore - libsql Implementation of NodeStore
//!
//! Wraps `DatabaseService` and converts between `Node` documents and rows of
//! the `nodes` table. All SQL lives in `DatabaseService`; this layer handles
//! serialization, timestamp parsing and streaming.
//!
//! # Streaming
//!
//! `find` returns a stream that pulls rows lazily from its own connection.
//! Because the database runs in WAL mode, the move cascade can issue
//! `update_node` calls on other connections while the stream is still open.

use crate::db::database::{DatabaseService, DbCreateNodeParams, DbUpdateNodeParams};
use crate::db::node_store::{NodeStore, NodeStream};
use crate::models::{Node, NodeFilter, NodeUpdate};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::StreamExt;
use libsql::Row;
use serde_json::Value;
use std::sync::Arc;

/// `NodeStore` backed by an embedded libsql database
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapping an initialized DatabaseService
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Access the underlying DatabaseService
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        // Rows written by hand or by SQLite's CURRENT_TIMESTAMP
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
            s
        ))
    }

    /// Convert libsql::Row to Node model
    ///
    /// Expected columns (in order, see `NODE_COLUMNS`):
    /// id, parent_id, path, content, properties, created_at, modified_at
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: String = row.get(0).context("Failed to get id")?;
        let parent_id: Option<String> = row.get(1).context("Failed to get parent_id")?;
        let path: Option<String> = row.get(2).context("Failed to get path")?;
        let content: String = row.get(3).context("Failed to get content")?;
        let properties_json: String = row.get(4).context("Failed to get properties")?;
        let created_at_str: String = row.get(5).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(6).context("Failed to get modified_at")?;

        let properties: Value =
            serde_json::from_str(&properties_json).context("Failed to parse properties JSON")?;

        let mut node = Node::new_with_id(id, content, properties);
        node.parent_id = parent_id;
        node.path = path;
        node.created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        node.modified_at =
            Self::parse_timestamp(&modified_at_str).context("Failed to parse modified_at")?;
        node.mark_persisted();

        Ok(node)
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn create_node(&self, node: Node) -> Result<Node> {
        let properties_json =
            serde_json::to_string(&node.properties).context("Failed to serialize properties")?;
        let created_at = node.created_at.to_rfc3339();
        let modified_at = node.modified_at.to_rfc3339();

        let params = DbCreateNodeParams {
            id: &node.id,
            parent_id: node.parent_id.as_deref(),
            path: node.path.as_deref(),
            content: &node.content,
            properties: &properties_json,
            created_at: &created_at,
            modified_at: &modified_at,
        };

        self.db
            .db_create_node(params)
            .await
            .with_context(|| format!("Failed to create node {}", node.id))?;

        let mut stored = node;
        stored.mark_persisted();
        Ok(stored)
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        match self.db.db_get_node(id).await? {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn find(&self, filter: NodeFilter) -> Result<NodeStream> {
        let rows = self.db.db_query_nodes(&filter).await?;

        let stream = futures::stream::try_unfold(rows, |mut rows| async move {
            let next = rows.next().await.context("Failed to read node row")?;
            match next {
                Some(row) => {
                    let node = Self::row_to_node(&row)?;
                    Ok::<_, anyhow::Error>(Some((node, rows)))
                }
                None => Ok(None),
            }
        });

        Ok(stream.boxed())
    }

    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node> {
        let properties_json = update
            .properties
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize properties")?;
        let modified_at = Utc::now().to_rfc3339();

        let params = DbUpdateNodeParams {
            parent_id: update.parent_id.as_ref().map(|p| p.as_deref()),
            path: update.path.as_deref(),
            content: update.content.as_deref(),
            properties: properties_json.as_deref(),
            modified_at: &modified_at,
        };

        let affected = self
            .db
            .db_update_node(id, params)
            .await
            .with_context(|| format!("Failed to update node {}", id))?;

        if affected == 0 {
            bail!("Node not found: {}", id);
        }

        self.get_node(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Node {} disappeared during update", id))
    }

    async fn remove(&self, filter: NodeFilter) -> Result<u64> {
        if filter.is_empty() {
            bail!("Refusing to remove with an empty filter");
        }

        Ok(self.db.db_delete_nodes(&filter).await?)
    }

    async fn close(&self) -> Result<()> {
        self.db.db_close().await?;
        Ok(())
    }
}
