//! Database Layer
//!
//! This module handles all persistence for tree nodes:
//!
//! - The `NodeStore` trait the tree services are written against
//! - `MemoryStore`, an indexed in-process backend
//! - `TursoStore`, an embedded libsql backend with path and parent indexes
//!
//! # Architecture
//!
//! The services never issue SQL directly. Everything they need from a
//! collection is expressed through `NodeFilter` (id set, parent equality,
//! path prefix, root flag) and `NodeUpdate` (sparse field writes), so any
//! document store able to answer a prefix range scan can host a tree.

mod database;
mod error;
mod memory_store;
mod node_store;
mod turso_store;

pub use database::{
    prefix_upper_bound, DatabaseService, DbCreateNodeParams, DbUpdateNodeParams, NODE_COLUMNS,
};
pub use error::DatabaseError;
pub use memory_store::MemoryStore;
pub use node_store::{NodeStore, NodeStream};
pub use turso_store::TursoStore;
