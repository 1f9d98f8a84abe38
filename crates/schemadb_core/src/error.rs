//! Error types for SchemaDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in SchemaDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persistent store error.
    #[error("storage error: {0}")]
    Storage(#[from] schemadb_storage::StorageError),

    /// Two tables share a name.
    #[error("duplicate table name: {name}")]
    DuplicateTable {
        /// The repeated table name.
        name: String,
    },

    /// Two rows of one table share a name.
    #[error("duplicate row in table {table}: {row}")]
    DuplicateRow {
        /// The table.
        table: String,
        /// The repeated row name.
        row: String,
    },

    /// A row declares a type outside string/number/boolean/bigint.
    #[error("invalid type for row {table}.{row}: {type_name}")]
    InvalidType {
        /// The table.
        table: String,
        /// The row.
        row: String,
        /// The declared type name.
        type_name: String,
    },

    /// A literal default does not match the row type.
    #[error("default value type mismatch for row {table}.{row}: expected {expected}")]
    DefaultTypeMismatch {
        /// The table.
        table: String,
        /// The row.
        row: String,
        /// The row's declared type.
        expected: String,
    },

    /// A default producer returned a value of the wrong type.
    #[error("default-producing function type mismatch for row {table}.{row}: expected {expected}")]
    DefaultProducerMismatch {
        /// The table.
        table: String,
        /// The row.
        row: String,
        /// The row's declared type.
        expected: String,
    },

    /// A primary key names a row the table does not declare.
    #[error("invalid primary key for table {table}: unknown row {row}")]
    InvalidPrimaryKey {
        /// The table.
        table: String,
        /// The unknown row.
        row: String,
    },

    /// A relation points at something that does not exist.
    #[error("invalid relation {table}.{relation}: {message}")]
    InvalidRelation {
        /// The table declaring the relation.
        table: String,
        /// The relation name.
        relation: String,
        /// What is wrong with it.
        message: String,
    },

    /// A schema declaration could not be parsed.
    #[error("invalid schema declaration: {message}")]
    InvalidSchema {
        /// Parser message.
        message: String,
    },

    /// Unknown table.
    #[error("unable to find table {name}")]
    UnknownTable {
        /// The requested name.
        name: String,
    },

    /// Unknown row referenced by a document, where clause or ordering.
    #[error("unable to find row definition for key {key} in table {table}")]
    UnknownRow {
        /// The table.
        table: String,
        /// The unknown key.
        key: String,
    },

    /// Unknown relation requested through `include`.
    #[error("unable to find relation {name} in table {table}")]
    UnknownRelation {
        /// The table.
        table: String,
        /// The requested relation.
        name: String,
    },

    /// A value does not match its row's declared type.
    #[error("unrecognized value for type {expected} in row {table}.{row}")]
    UnrecognizedValue {
        /// The table.
        table: String,
        /// The row.
        row: String,
        /// The row's declared type.
        expected: String,
    },

    /// A required row has no value and no default.
    #[error("missing value for required row {table}.{row}")]
    MissingValue {
        /// The table.
        table: String,
        /// The row.
        row: String,
    },

    /// A unique row or primary key would hold a duplicate value.
    #[error("uniqueness constraint violation in table {table}: {detail}")]
    UniqueViolation {
        /// The table.
        table: String,
        /// Which constraint collided.
        detail: String,
    },

    /// A where clause could not be parsed.
    #[error("invalid where clause: {message}")]
    InvalidWhere {
        /// Parser message.
        message: String,
    },

    /// Too many callers are already waiting on the connector lock.
    #[error("lock queue full: more than {capacity} pending acquisitions")]
    LockQueueFull {
        /// Configured capacity.
        capacity: usize,
    },

    /// A declared row cannot be added to an existing table.
    #[error("migration incompatible: table {table} is missing required row {row} and it has no default")]
    MigrationIncompatible {
        /// The table.
        table: String,
        /// The row that cannot be added.
        row: String,
    },

    /// Migration failed while copying or swapping tables.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// Description of the failure.
        message: String,
    },

    /// A stored value could not be decoded as its row type.
    #[error("invalid stored value in row {table}.{row}: {message}")]
    InvalidStoredValue {
        /// The table.
        table: String,
        /// The row.
        row: String,
        /// Description of the problem.
        message: String,
    },

    /// Connector is closed.
    #[error("connector is closed")]
    DatabaseClosed,
}

impl CoreError {
    /// Creates an unknown table error.
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable { name: name.into() }
    }

    /// Creates an unknown row error.
    pub fn unknown_row(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownRow {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Creates an unknown relation error.
    pub fn unknown_relation(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownRelation {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates an unrecognized value error.
    pub fn unrecognized_value(
        table: impl Into<String>,
        row: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::UnrecognizedValue {
            table: table.into(),
            row: row.into(),
            expected: expected.into(),
        }
    }

    /// Creates a missing value error.
    pub fn missing_value(table: impl Into<String>, row: impl Into<String>) -> Self {
        Self::MissingValue {
            table: table.into(),
            row: row.into(),
        }
    }

    /// Creates a uniqueness violation error.
    pub fn unique_violation(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UniqueViolation {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Creates an invalid where clause error.
    pub fn invalid_where(message: impl Into<String>) -> Self {
        Self::InvalidWhere {
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a migration failed error.
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }

    /// Wraps a store error raised while working on `table`.
    ///
    /// Uniqueness and primary key failures become [`CoreError::UniqueViolation`]
    /// so both connectors report collisions the same way.
    pub fn from_store(table: &str, err: schemadb_storage::StorageError) -> Self {
        match err {
            schemadb_storage::StorageError::Constraint(detail) => {
                Self::unique_violation(table, detail)
            }
            other => Self::Storage(other),
        }
    }

    /// Returns true for uniqueness and primary key violations.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Returns true for errors raised while building a schema.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTable { .. }
                | Self::DuplicateRow { .. }
                | Self::InvalidType { .. }
                | Self::DefaultTypeMismatch { .. }
                | Self::DefaultProducerMismatch { .. }
                | Self::InvalidPrimaryKey { .. }
                | Self::InvalidRelation { .. }
                | Self::InvalidSchema { .. }
        )
    }

    /// Returns true for per-operation validation errors.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTable { .. }
                | Self::UnknownRow { .. }
                | Self::UnknownRelation { .. }
                | Self::UnrecognizedValue { .. }
                | Self::MissingValue { .. }
                | Self::InvalidWhere { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadb_storage::StorageError;

    #[test]
    fn store_constraint_becomes_unique_violation() {
        let err = CoreError::from_store(
            "User",
            StorageError::Constraint("UNIQUE constraint failed: User.email".into()),
        );
        assert!(err.is_unique_violation());
        let msg = err.to_string();
        assert!(msg.contains("uniqueness constraint violation"));
        assert!(msg.contains("User.email"));
    }

    #[test]
    fn other_store_errors_keep_prefix_and_message() {
        let err = CoreError::from_store("User", StorageError::Closed);
        assert_eq!(err.to_string(), "storage error: store is closed");
    }

    #[test]
    fn classification() {
        assert!(CoreError::DuplicateTable { name: "a".into() }.is_schema_error());
        assert!(CoreError::unknown_row("a", "b").is_validation_error());
        assert!(!CoreError::DatabaseClosed.is_validation_error());
    }
}
