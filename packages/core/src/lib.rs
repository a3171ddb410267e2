//! PathTree Core - Materialized-Path Trees over a Flat Document Collection
//!
//! This crate keeps a hierarchy inside a flat collection of node documents.
//! Every node stores its parent reference and a materialized `path` (its
//! ancestor ids plus its own, joined by a separator), so subtree queries are
//! a single prefix scan.
//!
//! # Architecture
//!
//! - **Pre-write stage**: paths are computed before a node is created or
//!   re-parented, and re-parenting rewrites every descendant's path
//! - **Pre-delete stage**: deleting a node removes its whole subtree with one
//!   bulk prefix delete
//! - **Store-agnostic**: services talk to the `NodeStore` trait; an in-memory
//!   store and an embedded libsql store are included
//!
//! # Modules
//!
//! - [`models`] - Node document, filters and updates
//! - [`tree`] - Path codec (pure functions over path strings)
//! - [`services`] - Path maintainer, deletion cascade, queries, `TreeService`
//! - [`db`] - `NodeStore` trait with memory and libsql backends
//! - [`config`] - Separator and cycle-rejection settings

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod tree;

// Re-export commonly used types
pub use config::TreeConfig;
pub use models::*;
pub use services::*;
pub use tree::{PathCodec, DEFAULT_PATH_SEPARATOR};
