//! # SchemaDB Core
//!
//! Schema-described document database engine.
//!
//! This crate provides:
//! - Schema model with validated row definitions and relations
//! - Where-clause engine (in-memory matcher and SQL translator)
//! - [`MemoryConnector`]: ephemeral in-process store
//! - [`SqlConnector`]: persistent store over any [`schemadb_storage::SqlStore`]
//! - Transactions with commit/error/complete callbacks
//! - Batched relation loading through `include`
//! - Additive schema migration for the SQL connector
//!
//! Both connectors implement [`Connector`] and agree on every observable
//! result and error.
//!
//! ```rust
//! use schemadb_core::{doc, Connector, FindOptions, MemoryConnector, RowDecl, RowType, Schema, TableDecl, WhereClause};
//!
//! let schema = Schema::new(vec![TableDecl::new("User", "id")
//!     .row(RowDecl::new("id", RowType::String))
//!     .row(RowDecl::new("email", RowType::String).unique())])
//! .unwrap();
//!
//! let db = MemoryConnector::new(schema);
//! db.create("User", doc! { "id" => "u1", "email" => "a@example.com" }).unwrap();
//!
//! let found = db
//!     .find_one("User", FindOptions::new(WhereClause::eq("email", "a@example.com")))
//!     .unwrap();
//! assert!(found.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connector;
mod error;
mod lock;
mod memory;
pub mod migration;
pub mod query;
mod relation;
pub mod schema;
mod sql;
mod transaction;
mod validate;
mod value;

pub use config::Config;
pub use connector::{Connector, Upsert};
pub use error::{CoreError, CoreResult};
pub use memory::MemoryConnector;
pub use migration::{MigrationOperation, MigrationReport, Migrator, RebuiltTable};
pub use query::{Condition, Filter, FindOptions, Include, OrderBy, SortDirection, WhereClause};
pub use schema::{
    DefaultValue, RelationDecl, RowDecl, RowDef, RowOptions, RowType, Schema, Table, TableDecl,
};
pub use sql::SqlConnector;
pub use transaction::{
    CallbackError, CallbackResult, TransactionHandle, TransactionId, TransactionOutcome,
};
pub use value::{Document, Value};
