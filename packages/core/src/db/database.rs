//! Database Connection Management
//!
//! This module provides the libsql/Turso connection and schema for the
//! embedded tree store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **One flat table**: `nodes` holds every document of every tree
//! - **Indexed hierarchy**: `parent_id` (children lookups) and `path`
//!   (subtree range scans) are both indexed
//! - **WAL mode**: a cascade may write from one connection while a subtree
//!   query is still streaming from another
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The 5-second busy
//! timeout lets concurrent operations wait instead of failing immediately with
//! `SQLITE_BUSY`.
//!
//! # Prefix Queries
//!
//! A path prefix is translated to the half-open range
//! `path >= prefix AND path < upper_bound(prefix)`, which SQLite answers from
//! `idx_nodes_path` without scanning the table.

use crate::db::error::DatabaseError;
use crate::models::NodeFilter;
use libsql::{Builder, Database, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Columns selected for every node query, in `row_to_node` order
pub const NODE_COLUMNS: &str = "id, parent_id, path, content, properties, created_at, modified_at";

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use pathtree_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_path = PathBuf::from("/path/to/tree.db");
///     let db_service = DatabaseService::new(db_path).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for node insertion (avoids too-many-arguments lint)
pub struct DbCreateNodeParams<'a> {
    pub id: &'a str,
    pub parent_id: Option<&'a str>,
    pub path: Option<&'a str>,
    pub content: &'a str,
    pub properties: &'a str,
    pub created_at: &'a str,
    pub modified_at: &'a str,
}

/// Parameters for a sparse node update
///
/// `None` leaves a column untouched; `parent_id: Some(None)` writes NULL.
#[derive(Default)]
pub struct DbUpdateNodeParams<'a> {
    pub parent_id: Option<Option<&'a str>>,
    pub path: Option<&'a str>,
    pub content: Option<&'a str>,
    pub properties: Option<&'a str>,
    pub modified_at: &'a str,
}

/// Smallest string greater than every string starting with `prefix`
///
/// Returns `None` when no such bound exists (prefix of only `char::MAX`).
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();

    while let Some(last) = chars.pop() {
        let next = match last as u32 {
            0xD7FF => Some('\u{E000}'),
            code => char::from_u32(code + 1),
        };

        if let Some(next) = next {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }

    None
}

/// Build a `WHERE` clause (including the keyword) and its bound values
///
/// An empty filter yields an empty clause.
pub fn where_clause(filter: &NodeFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ids) = &filter.ids {
        if ids.is_empty() {
            clauses.push("0 = 1".to_string());
        } else {
            let placeholders = vec!["?"; ids.len()].join(", ");
            clauses.push(format!("id IN ({})", placeholders));
            values.extend(ids.iter().map(|id| Value::Text(id.clone())));
        }
    }

    if let Some(parent_id) = &filter.parent_id {
        clauses.push("parent_id = ?".to_string());
        values.push(Value::Text(parent_id.clone()));
    }

    if let Some(prefix) = &filter.path_prefix {
        match prefix_upper_bound(prefix) {
            Some(upper) => {
                clauses.push("path >= ? AND path < ?".to_string());
                values.push(Value::Text(prefix.clone()));
                values.push(Value::Text(upper));
            }
            None => {
                clauses.push("path >= ?".to_string());
                values.push(Value::Text(prefix.clone()));
            }
        }
    }

    match filter.is_root {
        Some(true) => clauses.push("parent_id IS NULL".to_string()),
        Some(false) => clauses.push("parent_id IS NOT NULL".to_string()),
        None => {}
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on an existing database.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                path TEXT,
                content TEXT NOT NULL DEFAULT '',
                properties JSON NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create nodes table: {}", e))
        })?;

        // Children lookups (get_children non-recursive)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_nodes_parent': {}",
                e
            ))
        })?;

        // Subtree range scans (cascade, delete, recursive children)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_nodes_path': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only use this where the connection won't be used across `.await`
    /// points; prefer `connect_with_timeout()`.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        Ok(conn)
    }

    /// Insert a node row
    pub async fn db_create_node(
        &self,
        params: DbCreateNodeParams<'_>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO nodes (id, parent_id, path, content, properties, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                params.id,
                params.parent_id,
                params.path,
                params.content,
                params.properties,
                params.created_at,
                params.modified_at,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert node: {}", e)))?;

        Ok(())
    }

    /// Retrieve a single node row by ID
    ///
    /// * `Ok(Some(row))` - Node found
    /// * `Ok(None)` - Node not found in database
    /// * `Err(DatabaseError)` - Query execution failed
    pub async fn db_get_node(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Query node rows matching a filter, ordered by path
    ///
    /// The returned `Rows` keep their own connection alive, so callers may
    /// consume them lazily while other connections write.
    pub async fn db_query_nodes(&self, filter: &NodeFilter) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let (where_sql, values) = where_clause(filter);
        let limit_sql = filter
            .limit
            .map(|l| format!(" LIMIT {}", l))
            .unwrap_or_default();

        let sql = format!(
            "SELECT {} FROM nodes{} ORDER BY path, id{}",
            NODE_COLUMNS, where_sql, limit_sql
        );

        conn.query(&sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to query nodes: {}", e)))
    }

    /// Apply a sparse update to one node row
    ///
    /// Returns the number of rows affected (0 = node doesn't exist).
    pub async fn db_update_node(
        &self,
        id: &str,
        params: DbUpdateNodeParams<'_>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(parent_id) = params.parent_id {
            sets.push("parent_id = ?");
            values.push(match parent_id {
                Some(parent_id) => Value::Text(parent_id.to_string()),
                None => Value::Null,
            });
        }
        if let Some(path) = params.path {
            sets.push("path = ?");
            values.push(Value::Text(path.to_string()));
        }
        if let Some(content) = params.content {
            sets.push("content = ?");
            values.push(Value::Text(content.to_string()));
        }
        if let Some(properties) = params.properties {
            sets.push("properties = ?");
            values.push(Value::Text(properties.to_string()));
        }
        sets.push("modified_at = ?");
        values.push(Value::Text(params.modified_at.to_string()));
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE nodes SET {} WHERE id = ?", sets.join(", "));

        conn.execute(&sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update node: {}", e)))
    }

    /// Delete every node row matching a filter
    ///
    /// Returns the number of rows removed. The caller is responsible for
    /// refusing empty filters.
    pub async fn db_delete_nodes(&self, filter: &NodeFilter) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let (where_sql, values) = where_clause(filter);
        let sql = format!("DELETE FROM nodes{}", where_sql);

        conn.execute(&sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete nodes: {}", e)))
    }

    /// Flush the WAL into the main database file
    pub async fn db_close(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await
    }
}
