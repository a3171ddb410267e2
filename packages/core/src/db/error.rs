//! libsql Backend Errors
//!
//! Failures raised while opening the tree database or running its SQL.
//! `TursoStore` turns these into `anyhow::Error` at the `NodeStore` boundary,
//! where the tree services report them as `TreeError::Store`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from `DatabaseService`
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// `Builder::new_local` could not open the file
    #[error("Failed to open tree database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// `nodes` table or its path/parent indexes could not be created
    #[error("Failed to initialize tree schema: {0}")]
    InitializationFailed(String),

    /// Parent directory of the database file is not writable
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// Raw libsql failure (connect, prepare, row access)
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// Node insert, query, update or delete failed; `context` names which
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },
}

impl DatabaseError {
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// `context` should name the statement that failed
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }
}
