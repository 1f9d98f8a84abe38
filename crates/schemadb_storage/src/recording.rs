//! Statement-recording store wrapper.

use crate::backend::SqlStore;
use crate::error::StorageResult;
use crate::statement::{SqlRow, Statement};
use parking_lot::Mutex;

/// Marker recorded for `begin()`.
pub const BEGIN: &str = "BEGIN";
/// Marker recorded for `commit()`.
pub const COMMIT: &str = "COMMIT";
/// Marker recorded for `rollback()`.
pub const ROLLBACK: &str = "ROLLBACK";

/// Wraps a store and records the text of every statement it forwards.
///
/// Transaction boundaries are recorded as `BEGIN`, `COMMIT` and
/// `ROLLBACK`. Statements are recorded before they run, so failed
/// statements appear in the log too.
///
/// # Example
///
/// ```rust
/// use schemadb_storage::{RecordingStore, SqlStore, SqliteStore, Statement};
///
/// let store = RecordingStore::new(SqliteStore::open_in_memory().unwrap());
/// store.query(&Statement::new("SELECT 1")).unwrap();
/// assert_eq!(store.statements(), vec!["SELECT 1".to_string()]);
/// ```
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    log: Mutex<Vec<String>>,
}

impl<S: SqlStore> RecordingStore<S> {
    /// Wraps a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of the recorded statements.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Counts recorded statements whose text starts with `prefix`.
    #[must_use]
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .count()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.log.lock().clear();
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(&self, sql: &str) {
        self.log.lock().push(sql.to_string());
    }
}

impl<S: SqlStore> SqlStore for RecordingStore<S> {
    fn execute(&self, statement: &Statement) -> StorageResult<usize> {
        self.record(&statement.sql);
        self.inner.execute(statement)
    }

    fn query(&self, statement: &Statement) -> StorageResult<Vec<SqlRow>> {
        self.record(&statement.sql);
        self.inner.query(statement)
    }

    fn begin(&self) -> StorageResult<()> {
        self.record(BEGIN);
        self.inner.begin()
    }

    fn commit(&self) -> StorageResult<()> {
        self.record(COMMIT);
        self.inner.commit()
    }

    fn rollback(&self) -> StorageResult<()> {
        self.record(ROLLBACK);
        self.inner.rollback()
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;

    #[test]
    fn records_statements_and_boundaries() {
        let store = RecordingStore::new(SqliteStore::open_in_memory().unwrap());
        store.begin().unwrap();
        store
            .execute(&Statement::new("CREATE TABLE t (x INTEGER)"))
            .unwrap();
        store.rollback().unwrap();

        assert_eq!(
            store.statements(),
            vec![
                BEGIN.to_string(),
                "CREATE TABLE t (x INTEGER)".to_string(),
                ROLLBACK.to_string()
            ]
        );
        assert_eq!(store.count_prefix("CREATE"), 1);
    }

    #[test]
    fn failed_statements_are_recorded() {
        let store = RecordingStore::new(SqliteStore::open_in_memory().unwrap());
        assert!(store.query(&Statement::new("SELECT * FROM missing")).is_err());
        assert_eq!(store.count_prefix("SELECT"), 1);
    }

    #[test]
    fn clear_empties_log() {
        let store = RecordingStore::new(SqliteStore::open_in_memory().unwrap());
        store.query(&Statement::new("SELECT 1")).unwrap();
        store.clear();
        assert!(store.statements().is_empty());
    }
}
