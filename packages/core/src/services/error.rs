//! Service Layer Error Types
//!
//! This module defines the errors surfaced by the tree services. Store
//! failures arrive as `anyhow::Error` from `NodeStore` implementations and are
//! wrapped here with the structural context the caller needs.

use crate::models::ValidationError;
use thiserror::Error;

/// Tree operation errors
///
/// Every failure aborts the triggering `save`/`remove`; nothing is retried.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Store I/O failed (lookup, query, write, or delete)
    #[error("Store operation failed: {0}")]
    Store(#[from] anyhow::Error),

    /// Node referenced by id does not exist
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Declared parent does not exist
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// Declared parent exists but has never been given a path
    #[error("Parent node {parent_id} has no materialized path")]
    ParentPathMissing { parent_id: String },

    /// Descendant path rewriting failed part-way; rewritten descendants stay rewritten
    #[error("Path cascade for node {node_id} failed after rewriting {rewritten} descendants: {source}")]
    Cascade {
        node_id: String,
        rewritten: u64,
        #[source]
        source: anyhow::Error,
    },

    /// Re-parenting would make a node its own ancestor
    #[error("Circular reference: cannot move node {node_id} under {parent_id}")]
    CircularReference { node_id: String, parent_id: String },

    /// Identifier contains the path separator
    #[error("Invalid node identifier '{id}': contains path separator '{separator}'")]
    InvalidIdentifier { id: String, separator: String },

    /// Node validation failed
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Configuration rejected by `TreeConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TreeError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a parent path missing error
    pub fn parent_path_missing(parent_id: impl Into<String>) -> Self {
        Self::ParentPathMissing {
            parent_id: parent_id.into(),
        }
    }

    /// Create a cascade error
    pub fn cascade(node_id: impl Into<String>, rewritten: u64, source: anyhow::Error) -> Self {
        Self::Cascade {
            node_id: node_id.into(),
            rewritten,
            source,
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(node_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self::CircularReference {
            node_id: node_id.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(id: impl Into<String>, separator: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            separator: separator.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the subtree may have been left partially rewritten
    pub fn is_partial_cascade(&self) -> bool {
        matches!(self, Self::Cascade { rewritten, .. } if *rewritten > 0)
    }
}
