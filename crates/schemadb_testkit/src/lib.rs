//! # SchemaDB Testkit
//!
//! Test utilities for SchemaDB.
//!
//! This crate provides:
//! - A shared blog schema and connector constructors for every backend
//! - Property-based generators for documents and where clauses
//! - Log capture for tests through `tracing-subscriber`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemadb_core::{Connector, WhereClause};
//! use schemadb_testkit::prelude::*;
//!
//! #[test]
//! fn creates_users_on_every_backend() {
//!     init_tracing();
//!     let memory = memory_connector();
//!     let sqlite = sqlite_connector();
//!     memory.create("User", user(1)).unwrap();
//!     sqlite.create("User", user(1)).unwrap();
//!     assert_eq!(sqlite.count("User", &WhereClause::all()).unwrap(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
}

pub use fixtures::*;
pub use generators::*;

/// Routes `tracing` output to the test writer.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
