//! Error types for the workspace database layer.

use thiserror::Error;

/// Database operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, schema introspection, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query execution failed; message is already rewritten for the user
    #[error("{0}")]
    Query(String),

    /// Uploaded/imported data could not be processed
    #[error("Data processing error: {0}")]
    DataProcessing(String),
}

impl DbError {
    /// Create a data processing error.
    pub fn data_processing(msg: impl Into<String>) -> Self {
        Self::DataProcessing(msg.into())
    }
}
