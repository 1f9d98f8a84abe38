//! Additive schema migration for SQL stores.
//!
//! When a [`crate::SqlConnector`] opens, the [`Migrator`] reconciles the
//! declared schema with the tables already in the store:
//!
//! - **Missing tables** are created
//! - **Tables with a different column set or different constraints** are
//!   rebuilt: a shadow table is created with the declared layout, rows are
//!   copied over in batches (undeclared columns are dropped, new columns get
//!   their defaults), and finally the old table is dropped and the shadow
//!   renamed in one transaction. Constraints are `NOT NULL`, single-column
//!   unique indexes and the primary key, read back from the store's
//!   `PRAGMA`s.
//! - **Unchanged tables** are left alone
//!
//! Every table is checked before anything is written. A declared row that
//! is missing from its table, required and without a default makes the
//! whole migration fail with [`CoreError::MigrationIncompatible`].
//!
//! The copy runs one transaction per batch, not one overall. If the process
//! dies mid-copy the original table is intact and a `*_shadow_*` table is
//! left behind for an operator to remove. Existing rows that break a newly
//! declared constraint (duplicates in a row made `unique`, nulls in a row
//! made required) fail the copy with [`CoreError::MigrationFailed`] and
//! leave the original table untouched.

use crate::error::{CoreError, CoreResult};
use crate::schema::{Schema, Table};
use crate::sql::{codec, statements};
use crate::validate::default_value;
use crate::value::Document;
use schemadb_storage::{SqlRow, SqlStore, SqlValue, Statement};
use std::collections::HashSet;

/// A change the migrator makes to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOperation {
    /// Create a table that does not exist yet.
    CreateTable {
        /// Table name.
        table: String,
    },
    /// Rebuild a table whose columns or constraints differ from its
    /// declaration.
    RebuildTable {
        /// Table name.
        table: String,
        /// Declared rows the table lacks.
        added: Vec<String>,
        /// Columns no longer declared; their data is discarded.
        dropped: Vec<String>,
        /// Kept columns whose `NOT NULL` or `UNIQUE` constraint changed.
        constrained: Vec<String>,
        /// The primary key columns changed.
        primary_key_changed: bool,
    },
}

/// Rows copied while rebuilding one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltTable {
    /// Table name.
    pub table: String,
    /// Rows copied into the new layout.
    pub rows_copied: usize,
    /// Copy batches, one transaction each.
    pub batches: usize,
}

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tables created.
    pub created: Vec<String>,
    /// Tables rebuilt.
    pub rebuilt: Vec<RebuiltTable>,
}

impl MigrationReport {
    /// Returns true if the store already matched the schema.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.rebuilt.is_empty()
    }
}

/// Reconciles a schema with a SQL store.
#[derive(Debug)]
pub struct Migrator<'a, S: SqlStore + ?Sized> {
    schema: &'a Schema,
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: SqlStore + ?Sized> Migrator<'a, S> {
    /// Creates a migrator copying 1000 rows per batch.
    pub fn new(schema: &'a Schema, store: &'a S) -> Self {
        Self {
            schema,
            store,
            batch_size: 1000,
        }
    }

    /// Sets the number of rows copied per batch. Zero is treated as one.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Works out the operations needed, without writing anything.
    ///
    /// # Errors
    ///
    /// [`CoreError::MigrationIncompatible`] for the first table that cannot
    /// be migrated, or storage errors while inspecting the store.
    pub fn plan(&self) -> CoreResult<Vec<MigrationOperation>> {
        let live = self.live_tables()?;
        for name in &live {
            if name.contains("_shadow_") {
                tracing::warn!(table = %name, "found leftover shadow table from an interrupted migration");
            }
        }

        let mut operations = Vec::new();
        for table in self.schema.tables() {
            if !live.contains(table.name()) {
                operations.push(MigrationOperation::CreateTable {
                    table: table.name().to_string(),
                });
                continue;
            }

            let columns = self.live_columns(table.name())?;
            let unique = self.live_unique_columns(table.name())?;
            let mut added = Vec::new();
            let mut constrained = Vec::new();
            for row in table.rows() {
                if let Some(column) = columns.iter().find(|c| c.name == row.name) {
                    if column.not_null == row.optional || unique.contains(&row.name) != row.unique {
                        constrained.push(row.name.clone());
                    }
                    continue;
                }
                if row.is_required() {
                    return Err(CoreError::MigrationIncompatible {
                        table: table.name().to_string(),
                        row: row.name.clone(),
                    });
                }
                added.push(row.name.clone());
            }
            let dropped: Vec<String> = columns
                .iter()
                .filter(|column| table.row(&column.name).is_none())
                .map(|column| column.name.clone())
                .collect();

            let mut live_key: Vec<&LiveColumn> =
                columns.iter().filter(|c| c.key_position > 0).collect();
            live_key.sort_by_key(|c| c.key_position);
            let primary_key_changed = !live_key
                .iter()
                .map(|c| c.name.as_str())
                .eq(table.primary_key().iter().map(String::as_str));

            let reshaped = !added.is_empty() || !dropped.is_empty();
            if reshaped || !constrained.is_empty() || primary_key_changed {
                operations.push(MigrationOperation::RebuildTable {
                    table: table.name().to_string(),
                    added,
                    dropped,
                    constrained,
                    primary_key_changed,
                });
            }
        }
        Ok(operations)
    }

    /// Plans and applies the migration.
    ///
    /// # Errors
    ///
    /// Planning errors (nothing written), or [`CoreError::MigrationFailed`]
    /// if a rebuild fails.
    pub fn run(&self) -> CoreResult<MigrationReport> {
        let operations = self.plan()?;
        let mut report = MigrationReport::default();

        for operation in operations {
            match operation {
                MigrationOperation::CreateTable { table } => {
                    let def = self.schema.table(&table)?;
                    self.execute(&statements::create_table(def, &table))?;
                    tracing::info!(table = %table, "created table");
                    report.created.push(table);
                }
                MigrationOperation::RebuildTable {
                    table,
                    added,
                    dropped,
                    constrained,
                    primary_key_changed,
                } => {
                    let def = self.schema.table(&table)?;
                    tracing::info!(
                        table = %table,
                        ?added,
                        ?dropped,
                        ?constrained,
                        primary_key_changed,
                        "migrating table"
                    );
                    let rebuilt = self.rebuild(def)?;
                    tracing::info!(
                        table = %table,
                        rows = rebuilt.rows_copied,
                        batches = rebuilt.batches,
                        "migrated table"
                    );
                    report.rebuilt.push(rebuilt);
                }
            }
        }
        Ok(report)
    }

    fn execute(&self, statement: &Statement) -> CoreResult<usize> {
        tracing::debug!(sql = %statement, "migration");
        Ok(self.store.execute(statement)?)
    }

    fn live_tables(&self) -> CoreResult<HashSet<String>> {
        Ok(self
            .store
            .query(&statements::list_tables())?
            .iter()
            .filter_map(|row| text(row, "name").map(str::to_string))
            .collect())
    }

    fn live_columns(&self, table: &str) -> CoreResult<Vec<LiveColumn>> {
        Ok(self
            .store
            .query(&statements::table_columns(table))?
            .iter()
            .filter_map(|row| {
                Some(LiveColumn {
                    name: text(row, "name")?.to_string(),
                    not_null: integer(row, "notnull") != 0,
                    key_position: integer(row, "pk"),
                })
            })
            .collect())
    }

    // Columns covered by a single-column unique index other than the
    // primary key's.
    fn live_unique_columns(&self, table: &str) -> CoreResult<HashSet<String>> {
        let mut unique = HashSet::new();
        for index in self.store.query(&statements::index_list(table))? {
            if integer(&index, "unique") == 0 || text(&index, "origin") == Some("pk") {
                continue;
            }
            let Some(name) = text(&index, "name") else {
                continue;
            };
            let columns = self.store.query(&statements::index_columns(name))?;
            if let [column] = columns.as_slice() {
                if let Some(column) = text(column, "name") {
                    unique.insert(column.to_string());
                }
            }
        }
        Ok(unique)
    }

    fn rebuild(&self, table: &Table) -> CoreResult<RebuiltTable> {
        let shadow = format!("{}_shadow_{}", table.name(), uuid::Uuid::new_v4().simple());
        self.execute(&statements::create_table(table, &shadow))?;

        let result = self.copy_rows(table, &shadow).and_then(|rebuilt| {
            self.in_transaction(|| {
                self.execute(&statements::drop_table(table.name()))?;
                self.execute(&statements::rename_table(&shadow, table.name()))?;
                Ok(())
            })?;
            Ok(rebuilt)
        });

        result.map_err(|err| {
            if let Err(drop_err) = self.store.execute(&statements::drop_table(&shadow)) {
                tracing::warn!(table = %shadow, error = %drop_err, "failed to drop shadow table");
            }
            CoreError::migration_failed(format!("rebuilding table {}: {err}", table.name()))
        })
    }

    fn copy_rows(&self, table: &Table, shadow: &str) -> CoreResult<RebuiltTable> {
        let live = self.live_columns(table.name())?;
        let kept: Vec<&str> = table
            .rows()
            .iter()
            .map(|row| row.name.as_str())
            .filter(|name| live.iter().any(|c| c.name == *name))
            .collect();

        let mut rebuilt = RebuiltTable {
            table: table.name().to_string(),
            rows_copied: 0,
            batches: 0,
        };
        loop {
            let page = self.store.query(&statements::select_page(
                table.name(),
                &kept,
                self.batch_size,
                rebuilt.rows_copied,
            ))?;
            if page.is_empty() {
                break;
            }

            self.in_transaction(|| {
                for sql_row in &page {
                    let doc = self.fill_defaults(table, codec::decode_doc(table, sql_row)?)?;
                    self.execute(&statements::insert(shadow, &doc))?;
                }
                Ok(())
            })?;
            rebuilt.rows_copied += page.len();
            rebuilt.batches += 1;
            tracing::debug!(table = table.name(), rows = rebuilt.rows_copied, "copied batch");

            if page.len() < self.batch_size {
                break;
            }
        }
        Ok(rebuilt)
    }

    fn fill_defaults(&self, table: &Table, mut doc: Document) -> CoreResult<Document> {
        for row in table.rows() {
            if doc.contains_key(&row.name) {
                continue;
            }
            if let Some(default) = &row.default {
                doc.insert(row.name.clone(), default_value(table, row, default)?);
            }
        }
        Ok(doc)
    }

    fn in_transaction(&self, f: impl FnOnce() -> CoreResult<()>) -> CoreResult<()> {
        self.store.begin()?;
        match f().and_then(|()| Ok(self.store.commit()?)) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// A column as the store reports it.
#[derive(Debug)]
struct LiveColumn {
    name: String,
    not_null: bool,
    // 1-based position in the primary key, 0 outside it.
    key_position: i64,
}

fn text<'r>(row: &'r SqlRow, column: &str) -> Option<&'r str> {
    match row.get(column) {
        Some(SqlValue::Text(value)) => Some(value.as_str()),
        _ => None,
    }
}

fn integer(row: &SqlRow, column: &str) -> i64 {
    match row.get(column) {
        Some(SqlValue::Integer(value)) => *value,
        _ => 0,
    }
}
