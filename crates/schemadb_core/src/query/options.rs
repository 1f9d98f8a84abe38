//! Find options: ordering, pagination and relation includes.

use super::clause::WhereClause;
use crate::error::CoreResult;
use crate::schema::{Schema, Table};
use crate::value::Document;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first; absent values sort before everything.
    #[default]
    Ascending,
    /// Largest first; absent values sort after everything.
    Descending,
}

/// Ordering on a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Row to sort by.
    pub row: String,
    /// Direction.
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending order on `row`.
    pub fn asc(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending order on `row`.
    pub fn desc(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Compares two documents on the ordered row.
    ///
    /// Absent values compare lowest, as they do in SQL.
    pub(crate) fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = match (a.get_present(&self.row), b.get_present(&self.row)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
        };
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Relations to load, possibly nested.
///
/// ```rust
/// use schemadb_core::Include;
///
/// // posts, and each post's comments
/// let include = Include::new().with_nested("posts", Include::new().with("comments"));
/// assert!(!include.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Include(BTreeMap<String, Include>);

impl Include {
    /// Loads nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a relation without nested includes.
    #[must_use]
    pub fn with(self, relation: impl Into<String>) -> Self {
        self.with_nested(relation, Include::new())
    }

    /// Adds a relation with nested includes on the related documents.
    #[must_use]
    pub fn with_nested(mut self, relation: impl Into<String>, nested: Include) -> Self {
        self.0.insert(relation.into(), nested);
        self
    }

    /// Returns true if nothing is included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over relation names and their nested includes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Include)> {
        self.0.iter().map(|(name, nested)| (name.as_str(), nested))
    }

    /// Checks every relation, recursively, against the schema.
    pub(crate) fn validate(&self, schema: &Schema, table: &Table) -> CoreResult<()> {
        for (name, nested) in self.iter() {
            let relation = table.relation(name)?;
            nested.validate(schema, schema.table(&relation.foreign_table)?)?;
        }
        Ok(())
    }
}

/// Options for `find_one` and `find_many`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Filter.
    pub where_clause: WhereClause,
    /// Optional ordering; insertion order otherwise.
    pub order_by: Option<OrderBy>,
    /// Maximum number of documents.
    pub limit: Option<usize>,
    /// Number of matching documents to skip.
    pub offset: Option<usize>,
    /// Relations to attach.
    pub include: Include,
}

impl FindOptions {
    /// Finds documents matching `where_clause`.
    #[must_use]
    pub fn new(where_clause: WhereClause) -> Self {
        Self {
            where_clause,
            ..Self::default()
        }
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Sets the limit.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the relations to load.
    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }

    /// Validates the clause, ordering row and includes against `table`.
    pub(crate) fn validate(&self, schema: &Schema, table: &Table) -> CoreResult<()> {
        self.where_clause.validate(table)?;
        if let Some(order) = &self.order_by {
            table.require_row(&order.row)?;
        }
        self.include.validate(schema, table)
    }
}

impl From<WhereClause> for FindOptions {
    fn from(where_clause: WhereClause) -> Self {
        Self::new(where_clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn order_puts_absent_first_ascending() {
        let a = doc! { "n" => 1 };
        let b = doc! {};
        assert_eq!(OrderBy::asc("n").compare(&a, &b), Ordering::Greater);
        assert_eq!(OrderBy::desc("n").compare(&a, &b), Ordering::Less);
        assert_eq!(
            OrderBy::asc("n").compare(&a, &doc! { "n" => 2 }),
            Ordering::Less
        );
    }

    #[test]
    fn builder() {
        let opts = FindOptions::new(WhereClause::eq("a", 1))
            .limit(2)
            .include(Include::new().with("author"));
        assert_eq!(opts.limit, Some(2));
        assert_eq!(opts.offset, None);
        assert_eq!(opts.include.iter().count(), 1);
    }
}
