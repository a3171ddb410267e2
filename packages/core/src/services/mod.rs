//! Tree Services
//!
//! This module contains the materialized-path maintenance logic:
//!
//! - `PathMaintainer` - Path assignment before writes, with the move cascade
//! - `DeletionCascade` - Subtree removal before deletes
//! - `QueryService` - Children, parent, ancestors and level queries
//! - `TreeService` - Facade driving the stages around every store call
//!
//! Services depend only on the `NodeStore` trait, never on a concrete backend.

pub mod deletion_cascade;
pub mod error;
pub mod path_maintainer;
pub mod query_service;
pub mod tree_service;

pub use deletion_cascade::DeletionCascade;
pub use error::TreeError;
pub use path_maintainer::{PathMaintainer, WriteOutcome};
pub use query_service::QueryService;
pub use tree_service::TreeService;
