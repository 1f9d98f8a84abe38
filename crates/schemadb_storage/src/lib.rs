//! # SchemaDB Storage
//!
//! The persistent-store capability consumed by SchemaDB's SQL connector.
//!
//! A store is a thin statement executor. It does not know about schemas,
//! documents or where clauses; the connector renders those into
//! [`Statement`]s and interprets the [`SqlRow`]s that come back.
//!
//! ## Design Principles
//!
//! - Statements always carry their literals as positional parameters
//! - Constraint failures surface as [`StorageError::Constraint`] so callers
//!   can tell them apart from engine failures
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`SqliteStore`] - SQLite (bundled) on a file or in memory
//! - [`RecordingStore`] - Wrapper that records every statement it forwards
//!
//! ## Example
//!
//! ```rust
//! use schemadb_storage::{SqlStore, SqliteStore, SqlValue, Statement};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! store.execute(&Statement::new("CREATE TABLE t (x INTEGER)")).unwrap();
//! store
//!     .execute(&Statement::with_params("INSERT INTO t (x) VALUES (?)", vec![SqlValue::Integer(7)]))
//!     .unwrap();
//! let rows = store.query(&Statement::new("SELECT x FROM t")).unwrap();
//! assert_eq!(rows[0].get("x"), Some(&SqlValue::Integer(7)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod recording;
mod sqlite;
mod statement;

pub use backend::SqlStore;
pub use error::{StorageError, StorageResult};
pub use recording::{RecordingStore, BEGIN, COMMIT, ROLLBACK};
pub use sqlite::SqliteStore;
pub use statement::{quote_ident, SqlRow, SqlValue, Statement};
