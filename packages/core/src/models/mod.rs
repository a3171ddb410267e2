//! Data Models
//!
//! This module contains the data structures shared by the store backends and
//! the tree services:
//!
//! - `Node` - Document with parent reference and materialized path
//! - `NodeFilter` / `NodeUpdate` - Store query and sparse update types
//! - `ParentRef` - Parent given as an identifier or as a loaded node

mod node;

pub use node::{DeleteResult, Node, NodeFilter, NodeUpdate, ParentRef, ValidationError};
