//! Ephemeral in-process connector.

mod store;
mod unique;

use crate::config::Config;
use crate::connector::{Connector, Upsert};
use crate::error::CoreResult;
use crate::lock::ConnectorLock;
use crate::query::{FindOptions, WhereClause};
use crate::schema::Schema;
use crate::transaction::{self, TransactionHandle, TransactionOutcome};
use crate::transaction::TransactionIds;
use crate::value::Document;
use store::MemoryState;

/// A connector keeping every document in memory.
///
/// Documents live in per-table vectors in insertion order. Uniqueness is
/// enforced by hash indexes over each unique row and the primary key.
/// A transaction applies its writes to a clone of the whole state and swaps
/// it in only if every write succeeds.
///
/// # Example
///
/// ```rust
/// use schemadb_core::{doc, Connector, MemoryConnector, RowDecl, RowType, Schema, TableDecl, WhereClause};
///
/// let schema = Schema::new(vec![TableDecl::new("Todo", "id")
///     .row(RowDecl::new("id", RowType::BigInt))
///     .row(RowDecl::new("done", RowType::Boolean).default(false))]).unwrap();
/// let db = MemoryConnector::new(schema);
///
/// db.create("Todo", doc! { "id" => 1i64 }).unwrap();
/// assert_eq!(db.count("Todo", &WhereClause::eq("done", false)).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryConnector {
    schema: Schema,
    state: ConnectorLock<MemoryState>,
    txn_ids: TransactionIds,
}

impl MemoryConnector {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, Config::default())
    }

    /// Creates an empty store.
    #[must_use]
    pub fn with_config(schema: Schema, config: Config) -> Self {
        let state = MemoryState::new(&schema);
        Self {
            state: ConnectorLock::new(state, config.lock_queue_capacity),
            schema,
            txn_ids: TransactionIds::new(),
        }
    }
}

impl Connector for MemoryConnector {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, table: &str, doc: Document) -> CoreResult<Document> {
        let mut created = self.create_many(table, vec![doc])?;
        Ok(created.remove(0))
    }

    fn create_many(&self, table: &str, docs: Vec<Document>) -> CoreResult<Vec<Document>> {
        let table = self.schema.table(table)?;
        let mut state = self.state.write()?;
        state.ensure_open()?;
        state.create_many(table, docs)
    }

    fn find_many(&self, table: &str, options: FindOptions) -> CoreResult<Vec<Document>> {
        let table = self.schema.table(table)?;
        let state = self.state.read()?;
        state.ensure_open()?;
        state.find_many(&self.schema, table, &options)
    }

    fn count(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let state = self.state.read()?;
        state.ensure_open()?;
        state.count(table, where_clause)
    }

    fn update(&self, table: &str, where_clause: &WhereClause, patch: &Document) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let mut state = self.state.write()?;
        state.ensure_open()?;
        state.update(table, where_clause, patch)
    }

    fn upsert(&self, table: &str, upsert: Upsert) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let mut state = self.state.write()?;
        state.ensure_open()?;
        state.upsert(table, upsert)
    }

    fn delete(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let mut state = self.state.write()?;
        state.ensure_open()?;
        state.delete(table, where_clause)
    }

    fn transaction<F>(&self, body: F) -> CoreResult<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionHandle) -> CoreResult<()>,
    {
        transaction::run(self.txn_ids.next(), body, |writes| {
            let mut state = self.state.write()?;
            state.ensure_open()?;
            let mut snapshot = state.clone();
            snapshot.apply(&self.schema, writes)?;
            *state = snapshot;
            Ok(())
        })
    }

    fn close(&self) -> CoreResult<()> {
        self.state.write()?.close(false);
        Ok(())
    }

    fn close_and_wipe(&self) -> CoreResult<()> {
        let mut state = self.state.write()?;
        if state.is_closed() {
            return Ok(());
        }
        state.close(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::error::CoreError;
    use crate::schema::{RowDecl, RowType, TableDecl};
    use std::sync::Arc;
    use std::thread;

    fn connector() -> MemoryConnector {
        MemoryConnector::new(
            Schema::new(vec![TableDecl::new("User", "id")
                .row(RowDecl::new("id", RowType::String))
                .row(RowDecl::new("email", RowType::String).unique())])
            .unwrap(),
        )
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let db = connector();
        db.create("User", doc! { "id" => "a", "email" => "a@x" }).unwrap();

        let err = db
            .transaction(|txn| {
                txn.delete("User", WhereClause::all());
                txn.create("User", doc! { "id" => "b", "email" => "b@x" });
                txn.create("User", doc! { "id" => "c", "email" => "b@x" });
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_unique_violation());

        let users = db.find_many("User", FindOptions::default()).unwrap();
        assert_eq!(users, vec![doc! { "id" => "a", "email" => "a@x" }]);
    }

    #[test]
    fn reads_inside_transaction_body_see_old_state() {
        let db = connector();
        db.transaction(|txn| {
            txn.create("User", doc! { "id" => "a", "email" => "a@x" });
            assert_eq!(db.count("User", &WhereClause::all())?, 0);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
    }

    #[test]
    fn closed_connector_rejects_operations() {
        let db = connector();
        db.close().unwrap();
        assert!(matches!(
            db.count("User", &WhereClause::all()),
            Err(CoreError::DatabaseClosed)
        ));
        assert!(matches!(
            db.transaction(|_| Ok(())),
            Err(CoreError::DatabaseClosed)
        ));
    }

    #[test]
    fn wipe_after_close_keeps_documents() {
        let db = connector();
        db.create("User", doc! { "id" => "a", "email" => "a@x" }).unwrap();
        db.close().unwrap();
        db.close_and_wipe().unwrap();
        assert_eq!(db.state.read().unwrap().unique_keys("User"), 2);
    }

    #[test]
    fn concurrent_creates_keep_unique_values_distinct() {
        let db = Arc::new(connector());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    db.create("User", doc! { "id" => format!("u{i}"), "email" => "same@x" })
                        .is_ok()
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(created, 1);
        assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
    }
}
