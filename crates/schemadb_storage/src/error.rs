//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A `UNIQUE` or `PRIMARY KEY` constraint was violated.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The engine rejected a statement.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    /// A column held a value the store cannot represent.
    #[error("unsupported value in column {column}")]
    UnsupportedValue {
        /// The offending column.
        column: String,
    },

    /// The store is closed.
    #[error("store is closed")]
    Closed,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::Constraint(message.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => Self::Sqlite(err),
        }
    }
}

impl StorageError {
    /// Returns true if this is a uniqueness or primary key violation.
    #[must_use]
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}
