//! Persistent connector over a [`SqlStore`].

pub(crate) mod codec;
pub(crate) mod statements;

use crate::config::Config;
use crate::connector::{Connector, Upsert};
use crate::error::{CoreError, CoreResult};
use crate::lock::ConnectorLock;
use crate::migration::{MigrationReport, Migrator};
use crate::query::{FindOptions, WhereClause};
use crate::relation::load_relations;
use crate::schema::{Schema, Table};
use crate::transaction::{self, PendingWrite, TransactionHandle, TransactionOutcome};
use crate::transaction::TransactionIds;
use crate::validate::{prepare_create, prepare_patch};
use crate::value::Document;
use schemadb_storage::{SqlRow, SqlStore, SqlValue, SqliteStore, Statement};
use std::path::Path;

#[derive(Debug, Default)]
struct SqlState {
    closed: bool,
}

impl SqlState {
    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::DatabaseClosed)
        } else {
            Ok(())
        }
    }
}

/// A connector storing each table in a SQL table.
///
/// Opening the connector reconciles the schema with the store: missing
/// tables are created and tables whose columns differ are migrated (see
/// [`Migrator`]). Uniqueness is enforced by the engine's `UNIQUE` and
/// `PRIMARY KEY` constraints.
///
/// # Example
///
/// ```rust
/// use schemadb_core::{doc, Connector, FindOptions, RowDecl, RowType, Schema, SqlConnector, TableDecl};
///
/// let schema = Schema::new(vec![TableDecl::new("User", "id")
///     .row(RowDecl::new("id", RowType::String))]).unwrap();
/// let db = SqlConnector::open_in_memory(schema).unwrap();
///
/// db.create("User", doc! { "id" => "a" }).unwrap();
/// assert_eq!(db.find_many("User", FindOptions::default()).unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct SqlConnector<S: SqlStore = SqliteStore> {
    schema: Schema,
    store: S,
    state: ConnectorLock<SqlState>,
    txn_ids: TransactionIds,
    migration: MigrationReport,
}

impl SqlConnector<SqliteStore> {
    /// Opens a SQLite database file, creating it if needed.
    ///
    /// # Errors
    ///
    /// Storage errors, or migration errors; see [`SqlConnector::with_config`].
    pub fn open_path(schema: Schema, path: &Path) -> CoreResult<Self> {
        Self::open(schema, SqliteStore::open(path)?)
    }

    /// Opens a private in-memory SQLite database.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn open_in_memory(schema: Schema) -> CoreResult<Self> {
        Self::open(schema, SqliteStore::open_in_memory()?)
    }
}

impl<S: SqlStore> SqlConnector<S> {
    /// Opens a connector over `store` with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`SqlConnector::with_config`].
    pub fn open(schema: Schema, store: S) -> CoreResult<Self> {
        Self::with_config(schema, store, Config::default())
    }

    /// Opens a connector over `store`, migrating it to `schema`.
    ///
    /// # Errors
    ///
    /// [`CoreError::MigrationIncompatible`] if an existing table lacks a
    /// required row without a default; nothing is written in that case.
    /// [`CoreError::MigrationFailed`] or storage errors otherwise.
    pub fn with_config(schema: Schema, store: S, config: Config) -> CoreResult<Self> {
        let migration = Migrator::new(&schema, &store)
            .batch_size(config.migration_batch_size)
            .run()?;
        Ok(Self {
            schema,
            store,
            state: ConnectorLock::new(SqlState::default(), config.lock_queue_capacity),
            txn_ids: TransactionIds::new(),
            migration,
        })
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns what opening the connector did to the store.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    fn execute(&self, table: &Table, statement: &Statement) -> CoreResult<usize> {
        tracing::debug!(table = table.name(), sql = %statement, "execute");
        self.store
            .execute(statement)
            .map_err(|err| CoreError::from_store(table.name(), err))
    }

    fn query(&self, table: &Table, statement: &Statement) -> CoreResult<Vec<SqlRow>> {
        tracing::debug!(table = table.name(), sql = %statement, "query");
        self.store
            .query(statement)
            .map_err(|err| CoreError::from_store(table.name(), err))
    }

    /// Runs `f` between `BEGIN` and `COMMIT`, rolling back if it fails.
    fn atomically<T>(&self, f: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        self.store.begin()?;
        match f().and_then(|value| {
            self.store.commit()?;
            Ok(value)
        }) {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    // The helpers below assume the connector lock is held.

    fn insert_docs(&self, table: &Table, docs: Vec<Document>) -> CoreResult<Vec<Document>> {
        let prepared = docs
            .into_iter()
            .map(|doc| prepare_create(table, doc))
            .collect::<CoreResult<Vec<_>>>()?;
        for doc in &prepared {
            self.execute(table, &statements::insert(table.name(), doc))?;
        }
        Ok(prepared)
    }

    fn select(&self, table: &Table, options: &FindOptions) -> CoreResult<Vec<Document>> {
        options.validate(&self.schema, table)?;
        let mut docs = self
            .query(table, &statements::select(table, options))?
            .iter()
            .map(|row| codec::decode_doc(table, row))
            .collect::<CoreResult<Vec<_>>>()?;

        if !options.include.is_empty() {
            let mut fetch = |foreign: &Table, nested: FindOptions| self.select(foreign, &nested);
            load_relations(&self.schema, table, &mut docs, &options.include, &mut fetch)?;
        }
        Ok(docs)
    }

    fn count_where(&self, table: &Table, where_clause: &WhereClause) -> CoreResult<usize> {
        where_clause.validate(table)?;
        let rows = self.query(table, &statements::count(table, where_clause))?;
        match rows.first().and_then(|row| row.get(statements::COUNT_COLUMN)) {
            Some(SqlValue::Integer(n)) => Ok(usize::try_from(*n).unwrap_or_default()),
            other => Err(CoreError::InvalidStoredValue {
                table: table.name().to_string(),
                row: statements::COUNT_COLUMN.to_string(),
                message: format!("unexpected count result {other:?}"),
            }),
        }
    }

    fn update_where(&self, table: &Table, where_clause: &WhereClause, patch: &Document) -> CoreResult<usize> {
        where_clause.validate(table)?;
        prepare_patch(table, patch)?;
        if patch.is_empty() {
            return self.count_where(table, where_clause);
        }
        self.execute(table, &statements::update(table, where_clause, patch))
    }

    fn upsert_where(&self, table: &Table, upsert: Upsert) -> CoreResult<usize> {
        upsert.where_clause.validate(table)?;
        prepare_patch(table, &upsert.update)?;

        if self.count_where(table, &upsert.where_clause)? == 0 {
            self.insert_docs(table, vec![upsert.create])?;
            return Ok(1);
        }
        if upsert.update.is_empty() {
            return Ok(0);
        }
        self.execute(table, &statements::update(table, &upsert.where_clause, &upsert.update))
    }

    fn delete_where(&self, table: &Table, where_clause: &WhereClause) -> CoreResult<usize> {
        where_clause.validate(table)?;
        self.execute(table, &statements::delete(table, where_clause))
    }

    fn apply(&self, writes: Vec<PendingWrite>) -> CoreResult<()> {
        for write in writes {
            let table = self.schema.table(write.table())?;
            match write {
                PendingWrite::Create { docs, .. } => {
                    self.insert_docs(table, docs)?;
                }
                PendingWrite::Update {
                    where_clause,
                    patch,
                    ..
                } => {
                    self.update_where(table, &where_clause, &patch)?;
                }
                PendingWrite::Upsert { upsert, .. } => {
                    self.upsert_where(table, upsert)?;
                }
                PendingWrite::Delete { where_clause, .. } => {
                    self.delete_where(table, &where_clause)?;
                }
            }
        }
        Ok(())
    }
}

impl<S: SqlStore> Connector for SqlConnector<S> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, table: &str, doc: Document) -> CoreResult<Document> {
        let table = self.schema.table(table)?;
        let state = self.state.write()?;
        state.ensure_open()?;
        let mut created = self.insert_docs(table, vec![doc])?;
        Ok(created.remove(0))
    }

    fn create_many(&self, table: &str, docs: Vec<Document>) -> CoreResult<Vec<Document>> {
        let table = self.schema.table(table)?;
        let state = self.state.write()?;
        state.ensure_open()?;
        if docs.is_empty() {
            return Ok(docs);
        }
        self.atomically(|| self.insert_docs(table, docs))
    }

    fn find_many(&self, table: &str, options: FindOptions) -> CoreResult<Vec<Document>> {
        let table = self.schema.table(table)?;
        let state = self.state.read()?;
        state.ensure_open()?;
        self.select(table, &options)
    }

    fn count(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let state = self.state.read()?;
        state.ensure_open()?;
        self.count_where(table, where_clause)
    }

    fn update(&self, table: &str, where_clause: &WhereClause, patch: &Document) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let state = self.state.write()?;
        state.ensure_open()?;
        self.update_where(table, where_clause, patch)
    }

    fn upsert(&self, table: &str, upsert: Upsert) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let state = self.state.write()?;
        state.ensure_open()?;
        self.upsert_where(table, upsert)
    }

    fn delete(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize> {
        let table = self.schema.table(table)?;
        let state = self.state.write()?;
        state.ensure_open()?;
        self.delete_where(table, where_clause)
    }

    fn transaction<F>(&self, body: F) -> CoreResult<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionHandle) -> CoreResult<()>,
    {
        transaction::run(self.txn_ids.next(), body, |writes| {
            let state = self.state.write()?;
            state.ensure_open()?;
            self.atomically(|| self.apply(writes))
        })
    }

    fn close(&self) -> CoreResult<()> {
        let mut state = self.state.write()?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        self.store.close()?;
        Ok(())
    }

    fn close_and_wipe(&self) -> CoreResult<()> {
        let mut state = self.state.write()?;
        if state.closed {
            return Ok(());
        }
        self.atomically(|| {
            for table in self.schema.tables() {
                self.execute(table, &statements::delete(table, &WhereClause::all()))?;
            }
            Ok(())
        })?;
        state.closed = true;
        self.store.close()?;
        Ok(())
    }
}
