//! Uniqueness indexes for the memory connector.

use crate::schema::Table;
use crate::value::{Document, ValueKey};
use std::collections::HashSet;

/// One constraint: a unique row, or the primary key tuple.
#[derive(Debug, Clone)]
struct Constraint {
    rows: Vec<String>,
    /// Collision message, worded like the SQL engine's.
    detail: String,
    keys: HashSet<Vec<ValueKey>>,
}

impl Constraint {
    fn new(table: &str, rows: Vec<String>) -> Self {
        let columns: Vec<String> = rows.iter().map(|row| format!("{table}.{row}")).collect();
        Self {
            detail: format!("UNIQUE constraint failed: {}", columns.join(", ")),
            rows,
            keys: HashSet::new(),
        }
    }

    /// Absent values never collide, so a document missing any part has no key.
    fn key(&self, doc: &Document) -> Option<Vec<ValueKey>> {
        self.rows
            .iter()
            .map(|row| doc.get_present(row).and_then(|value| value.key()))
            .collect()
    }
}

/// All uniqueness constraints of one table.
///
/// Holds exactly the keys of the table's live documents.
#[derive(Debug, Clone)]
pub(crate) struct UniqueIndex {
    constraints: Vec<Constraint>,
}

impl UniqueIndex {
    pub(crate) fn for_table(table: &Table) -> Self {
        let mut constraints = vec![Constraint::new(table.name(), table.primary_key().to_vec())];
        for row in table.unique_rows() {
            if table.primary_key() != std::slice::from_ref(&row.name) {
                constraints.push(Constraint::new(table.name(), vec![row.name.clone()]));
            }
        }
        Self { constraints }
    }

    /// Adds a document's keys, or changes nothing and returns the collision.
    pub(crate) fn insert(&mut self, doc: &Document) -> Result<(), String> {
        let keys: Vec<Option<Vec<ValueKey>>> =
            self.constraints.iter().map(|c| c.key(doc)).collect();
        for (constraint, key) in self.constraints.iter().zip(&keys) {
            if key.as_ref().is_some_and(|key| constraint.keys.contains(key)) {
                return Err(constraint.detail.clone());
            }
        }
        for (constraint, key) in self.constraints.iter_mut().zip(keys) {
            if let Some(key) = key {
                constraint.keys.insert(key);
            }
        }
        Ok(())
    }

    /// Adds every document, or changes nothing and returns the first collision.
    pub(crate) fn insert_all<'a, I>(&mut self, docs: I) -> Result<(), String>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut added = Vec::new();
        for doc in docs {
            if let Err(detail) = self.insert(doc) {
                for doc in added {
                    self.remove(doc);
                }
                return Err(detail);
            }
            added.push(doc);
        }
        Ok(())
    }

    /// Frees a document's keys.
    pub(crate) fn remove(&mut self, doc: &Document) {
        for constraint in &mut self.constraints {
            if let Some(key) = constraint.key(doc) {
                constraint.keys.remove(&key);
            }
        }
    }

    /// Frees every key.
    pub(crate) fn clear(&mut self) {
        for constraint in &mut self.constraints {
            constraint.keys.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.constraints.iter().map(|c| c.keys.len()).sum()
    }
}
