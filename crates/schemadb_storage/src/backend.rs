//! Store trait definition.

use crate::error::StorageResult;
use crate::statement::{SqlRow, Statement};

/// A persistent SQL store used by SchemaDB.
///
/// Stores are **statement executors**. They run the statements the SQL
/// connector renders and hand back raw rows. SchemaDB owns all schema and
/// document interpretation.
///
/// # Invariants
///
/// - `execute` returns the number of rows the statement changed
/// - `query` returns rows in the order the engine produced them
/// - `begin`/`commit`/`rollback` bracket a unit of work; statements issued
///   between `begin` and `rollback` leave no trace
/// - A violated `UNIQUE` or `PRIMARY KEY` constraint fails with
///   [`crate::StorageError::Constraint`]
/// - Stores must be `Send + Sync`; they are shared behind an `Arc`
///
/// # Implementors
///
/// - [`super::SqliteStore`] - SQLite on disk or in memory
/// - [`super::RecordingStore`] - Statement-recording wrapper
pub trait SqlStore: Send + Sync {
    /// Executes a statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The statement violates a constraint (`Constraint`)
    /// - The store is closed (`Closed`)
    /// - The engine rejects the statement
    fn execute(&self, statement: &Statement) -> StorageResult<usize>;

    /// Runs a statement and collects its result rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the statement or the store
    /// is closed.
    fn query(&self, statement: &Statement) -> StorageResult<Vec<SqlRow>>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open or the store is
    /// closed.
    fn begin(&self) -> StorageResult<()>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the commit fails.
    fn commit(&self) -> StorageResult<()>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open.
    fn rollback(&self) -> StorageResult<()>;

    /// Closes the store. Further calls fail with `Closed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release its resources.
    fn close(&self) -> StorageResult<()>;
}
