//! Storage error types.

use spits_common::SpitsError;
use spits_sql::RenderError;
use thiserror::Error;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Table not found.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Table already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// Column not found.
    #[error("unknown column '{column}' in table '{table}'")]
    ColumnNotFound {
        /// Table the lookup ran against.
        table: String,
        /// The missing column.
        column: String,
    },

    /// Column already exists.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        /// Altered table.
        table: String,
        /// The repeated column.
        column: String,
    },

    /// NOT NULL or UNIQUE constraint violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Row shape does not match the table.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Statement the backend cannot run.
    #[error("unsupported statement: {0}")]
    Unsupported(#[from] RenderError),

    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Internal error.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for SpitsError {
    fn from(e: StorageError) -> Self {
        SpitsError::backend(e.to_string())
    }
}
