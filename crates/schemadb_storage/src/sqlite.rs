//! SQLite-backed store.

use crate::backend::SqlStore;
use crate::error::{StorageError, StorageResult};
use crate::statement::{SqlRow, SqlValue, Statement};
use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};

/// A store backed by a single SQLite connection.
///
/// The connection lives behind a mutex, so statements from different
/// threads are executed one at a time. SchemaDB's connector already
/// serializes writers; the mutex only protects the connection itself.
///
/// # Example
///
/// ```no_run
/// use schemadb_storage::SqliteStore;
/// use std::path::Path;
///
/// let store = SqliteStore::open(Path::new("app.db")).unwrap();
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to allocate the database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            path: None,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Returns the database file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StorageResult<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        f(conn).map_err(StorageError::from)
    }
}

impl SqlStore for SqliteStore {
    fn execute(&self, statement: &Statement) -> StorageResult<usize> {
        self.with_conn(|conn| {
            conn.execute(&statement.sql, params_from_iter(statement.params.iter()))
        })
    }

    fn query(&self, statement: &Statement) -> StorageResult<Vec<SqlRow>> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;

        let mut stmt = conn.prepare(&statement.sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                let value = SqlValue::from_ref(row.get_ref(idx)?, name).ok_or_else(|| {
                    StorageError::UnsupportedValue {
                        column: name.clone(),
                    }
                })?;
                columns.push((name.clone(), value));
            }
            out.push(SqlRow::new(columns));
        }
        Ok(out)
    }

    fn begin(&self) -> StorageResult<()> {
        self.with_conn(|conn| conn.execute_batch("BEGIN"))
    }

    fn commit(&self) -> StorageResult<()> {
        self.with_conn(|conn| conn.execute_batch("COMMIT"))
    }

    fn rollback(&self) -> StorageResult<()> {
        self.with_conn(|conn| conn.execute_batch("ROLLBACK"))
    }

    fn close(&self) -> StorageResult<()> {
        let conn = self.conn.lock().take();
        match conn {
            Some(conn) => conn.close().map_err(|(_, err)| StorageError::from(err)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::quote_ident;
    use tempfile::tempdir;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .execute(&Statement::new(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE, score REAL)",
            ))
            .unwrap();
        store
    }

    fn insert(store: &SqliteStore, id: i64, name: &str) -> StorageResult<usize> {
        store.execute(&Statement::with_params(
            "INSERT INTO t (id, name) VALUES (?, ?)",
            vec![SqlValue::Integer(id), SqlValue::Text(name.into())],
        ))
    }

    #[test]
    fn execute_reports_rows_affected() {
        let store = store_with_table();
        assert_eq!(insert(&store, 1, "a").unwrap(), 1);
        assert_eq!(insert(&store, 2, "b").unwrap(), 1);

        let changed = store
            .execute(&Statement::new("UPDATE t SET score = 1.5"))
            .unwrap();
        assert_eq!(changed, 2);
    }

    #[test]
    fn query_returns_named_columns() {
        let store = store_with_table();
        insert(&store, 1, "a").unwrap();

        let rows = store
            .query(&Statement::new("SELECT id, name, score FROM t"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Integer(1)));
        assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(rows[0].get("score"), Some(&SqlValue::Null));
    }

    #[test]
    fn unique_violation_maps_to_constraint() {
        let store = store_with_table();
        insert(&store, 1, "a").unwrap();

        let err = insert(&store, 2, "a").unwrap_err();
        assert!(err.is_constraint(), "unexpected error: {err}");

        let err = insert(&store, 1, "b").unwrap_err();
        assert!(err.is_constraint(), "unexpected error: {err}");
    }

    #[test]
    fn syntax_error_is_not_constraint() {
        let store = store_with_table();
        let err = store.execute(&Statement::new("INSERT INTO nope")).unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn rollback_discards_statements() {
        let store = store_with_table();
        store.begin().unwrap();
        insert(&store, 1, "a").unwrap();
        store.rollback().unwrap();

        let rows = store.query(&Statement::new("SELECT id FROM t")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn commit_keeps_statements() {
        let store = store_with_table();
        store.begin().unwrap();
        insert(&store, 1, "a").unwrap();
        store.commit().unwrap();

        let rows = store.query(&Statement::new("SELECT id FROM t")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn closed_store_rejects_statements() {
        let store = store_with_table();
        store.close().unwrap();
        assert!(matches!(
            store.query(&Statement::new("SELECT 1")),
            Err(StorageError::Closed)
        ));
        // closing twice is harmless
        store.close().unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .execute(&Statement::new("CREATE TABLE t (x TEXT)"))
                .unwrap();
            store
                .execute(&Statement::with_params(
                    "INSERT INTO t (x) VALUES (?)",
                    vec![SqlValue::Text("kept".into())],
                ))
                .unwrap();
            store.close().unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let rows = store.query(&Statement::new("SELECT x FROM t")).unwrap();
        assert_eq!(rows[0].get("x"), Some(&SqlValue::Text("kept".into())));
    }

    proptest::proptest! {
        #[test]
        fn quoted_identifiers_round_trip(suffix in "[a-zA-Z_\" .;-]{0,16}") {
            let name = format!("t{suffix}");
            let store = SqliteStore::open_in_memory().unwrap();
            store
                .execute(&Statement::new(format!(
                    "CREATE TABLE {} ({} TEXT)",
                    quote_ident(&name),
                    quote_ident(&name)
                )))
                .unwrap();
            let rows = store
                .query(&Statement::new(format!("SELECT * FROM {}", quote_ident(&name))))
                .unwrap();
            proptest::prop_assert!(rows.is_empty());
            let columns = store
                .query(&Statement::new(format!("PRAGMA table_info({})", quote_ident(&name))))
                .unwrap();
            proptest::prop_assert_eq!(columns[0].get("name"), Some(&SqlValue::Text(name.clone())));
        }
    }
}
