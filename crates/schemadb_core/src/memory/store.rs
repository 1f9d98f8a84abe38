//! Memory connector state and its operations.
//!
//! Every operation here assumes the caller holds the connector lock in the
//! right mode. Transactions run the same operations on a cloned state.

use super::unique::UniqueIndex;
use crate::connector::Upsert;
use crate::error::{CoreError, CoreResult};
use crate::query::{FindOptions, WhereClause};
use crate::relation::load_relations;
use crate::schema::{Schema, Table};
use crate::transaction::PendingWrite;
use crate::validate::{prepare_create, prepare_patch};
use crate::value::Document;
use std::collections::HashMap;

/// Documents of one table in insertion order, plus their unique keys.
#[derive(Debug, Clone)]
struct TableData {
    docs: Vec<Document>,
    index: UniqueIndex,
}

/// The whole store. Cloning it takes a snapshot.
#[derive(Debug, Clone)]
pub(crate) struct MemoryState {
    tables: HashMap<String, TableData>,
    closed: bool,
}

impl MemoryState {
    pub(crate) fn new(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|table| {
                let data = TableData {
                    docs: Vec::new(),
                    index: UniqueIndex::for_table(table),
                };
                (table.name().to_string(), data)
            })
            .collect();
        Self {
            tables,
            closed: false,
        }
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::DatabaseClosed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self, wipe: bool) {
        if wipe {
            for data in self.tables.values_mut() {
                data.docs.clear();
                data.index.clear();
            }
        }
        self.closed = true;
    }

    fn data(&self, table: &Table) -> CoreResult<&TableData> {
        self.tables
            .get(table.name())
            .ok_or_else(|| CoreError::unknown_table(table.name()))
    }

    fn data_mut(&mut self, table: &Table) -> CoreResult<&mut TableData> {
        self.tables
            .get_mut(table.name())
            .ok_or_else(|| CoreError::unknown_table(table.name()))
    }

    pub(crate) fn create_many(
        &mut self,
        table: &Table,
        docs: Vec<Document>,
    ) -> CoreResult<Vec<Document>> {
        let prepared = docs
            .into_iter()
            .map(|doc| prepare_create(table, doc))
            .collect::<CoreResult<Vec<_>>>()?;
        if prepared.is_empty() {
            return Ok(prepared);
        }

        let data = self.data_mut(table)?;
        data.index
            .insert_all(&prepared)
            .map_err(|detail| CoreError::unique_violation(table.name(), detail))?;
        data.docs.extend(prepared.iter().cloned());
        Ok(prepared)
    }

    pub(crate) fn find_many(
        &self,
        schema: &Schema,
        table: &Table,
        options: &FindOptions,
    ) -> CoreResult<Vec<Document>> {
        options.validate(schema, table)?;
        let data = self.data(table)?;

        let mut found: Vec<&Document> = data
            .docs
            .iter()
            .filter(|doc| options.where_clause.matches(doc))
            .collect();
        if let Some(order) = &options.order_by {
            // stable, so ties stay in insertion order
            found.sort_by(|a, b| order.compare(a, b));
        }

        let mut docs: Vec<Document> = found
            .into_iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        if !options.include.is_empty() {
            let mut fetch = |foreign: &Table, nested: FindOptions| self.find_many(schema, foreign, &nested);
            load_relations(schema, table, &mut docs, &options.include, &mut fetch)?;
        }
        Ok(docs)
    }

    pub(crate) fn count(&self, table: &Table, where_clause: &WhereClause) -> CoreResult<usize> {
        where_clause.validate(table)?;
        let data = self.data(table)?;
        Ok(data.docs.iter().filter(|doc| where_clause.matches(doc)).count())
    }

    pub(crate) fn update(
        &mut self,
        table: &Table,
        where_clause: &WhereClause,
        patch: &Document,
    ) -> CoreResult<usize> {
        where_clause.validate(table)?;
        prepare_patch(table, patch)?;
        let data = self.data_mut(table)?;

        let matched: Vec<usize> = data
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| where_clause.matches(doc))
            .map(|(idx, _)| idx)
            .collect();
        if patch.is_empty() || matched.is_empty() {
            return Ok(matched.len());
        }

        let patched: Vec<Document> = matched
            .iter()
            .map(|&idx| {
                let mut doc = data.docs[idx].clone();
                doc.merge(patch);
                doc
            })
            .collect();

        for &idx in &matched {
            data.index.remove(&data.docs[idx]);
        }
        if let Err(detail) = data.index.insert_all(&patched) {
            // restore the keys of the untouched documents
            for &idx in &matched {
                let _ = data.index.insert(&data.docs[idx]);
            }
            return Err(CoreError::unique_violation(table.name(), detail));
        }

        for (idx, doc) in matched.iter().zip(patched) {
            data.docs[*idx] = doc;
        }
        Ok(matched.len())
    }

    pub(crate) fn upsert(&mut self, table: &Table, upsert: Upsert) -> CoreResult<usize> {
        upsert.where_clause.validate(table)?;
        prepare_patch(table, &upsert.update)?;

        if self.count(table, &upsert.where_clause)? == 0 {
            self.create_many(table, vec![upsert.create])?;
            return Ok(1);
        }
        if upsert.update.is_empty() {
            return Ok(0);
        }
        self.update(table, &upsert.where_clause, &upsert.update)
    }

    pub(crate) fn delete(&mut self, table: &Table, where_clause: &WhereClause) -> CoreResult<usize> {
        where_clause.validate(table)?;
        let data = self.data_mut(table)?;

        let before = data.docs.len();
        let TableData { docs, index } = data;
        docs.retain(|doc| {
            let remove = where_clause.matches(doc);
            if remove {
                index.remove(doc);
            }
            !remove
        });
        Ok(before - docs.len())
    }

    /// Applies transaction writes in order, stopping at the first failure.
    pub(crate) fn apply(&mut self, schema: &Schema, writes: Vec<PendingWrite>) -> CoreResult<()> {
        for write in writes {
            let table = schema.table(write.table())?;
            match write {
                PendingWrite::Create { docs, .. } => {
                    self.create_many(table, docs)?;
                }
                PendingWrite::Update {
                    where_clause,
                    patch,
                    ..
                } => {
                    self.update(table, &where_clause, &patch)?;
                }
                PendingWrite::Upsert { upsert, .. } => {
                    self.upsert(table, upsert)?;
                }
                PendingWrite::Delete { where_clause, .. } => {
                    self.delete(table, &where_clause)?;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn unique_keys(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |data| data.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::schema::{RowDecl, RowType, TableDecl};
    use crate::value::Value;

    fn schema() -> Schema {
        Schema::new(vec![TableDecl::new("User", "id")
            .row(RowDecl::new("id", RowType::String))
            .row(RowDecl::new("email", RowType::String).unique())
            .row(RowDecl::new("age", RowType::Number).optional())])
        .unwrap()
    }

    fn seeded(schema: &Schema) -> MemoryState {
        let mut state = MemoryState::new(schema);
        let table = schema.table("User").unwrap();
        state
            .create_many(
                table,
                vec![
                    doc! { "id" => "a", "email" => "a@x", "age" => 30 },
                    doc! { "id" => "b", "email" => "b@x", "age" => 20 },
                    doc! { "id" => "c", "email" => "c@x" },
                ],
            )
            .unwrap();
        state
    }

    #[test]
    fn update_collision_restores_index() {
        let schema = schema();
        let table = schema.table("User").unwrap();
        let mut state = seeded(&schema);
        let keys = state.unique_keys("User");

        let err = state
            .update(table, &WhereClause::is_in("id", ["a", "b"]), &doc! { "email" => "z@x" })
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(state.unique_keys("User"), keys);

        // original values are still taken
        let err = state
            .create_many(table, vec![doc! { "id" => "d", "email" => "a@x" }])
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn update_can_reuse_own_value() {
        let schema = schema();
        let table = schema.table("User").unwrap();
        let mut state = seeded(&schema);
        let n = state
            .update(table, &WhereClause::eq("id", "a"), &doc! { "email" => "a@x", "age" => Value::Null })
            .unwrap();
        assert_eq!(n, 1);
        let found = state
            .find_many(&schema, table, &FindOptions::new(WhereClause::eq("id", "a")))
            .unwrap();
        assert_eq!(found, vec![doc! { "id" => "a", "email" => "a@x" }]);
    }

    #[test]
    fn delete_frees_keys() {
        let schema = schema();
        let table = schema.table("User").unwrap();
        let mut state = seeded(&schema);
        assert_eq!(state.delete(table, &WhereClause::lt("age", 25)).unwrap(), 1);
        assert_eq!(state.unique_keys("User"), 4);
        state
            .create_many(table, vec![doc! { "id" => "b", "email" => "b@x" }])
            .unwrap();
    }

    #[test]
    fn close_and_wipe() {
        let schema = schema();
        let mut state = seeded(&schema);
        state.close(true);
        assert!(matches!(state.ensure_open(), Err(CoreError::DatabaseClosed)));
        assert_eq!(state.unique_keys("User"), 0);
    }
}
