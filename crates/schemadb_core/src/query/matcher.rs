//! In-memory evaluation of where clauses.

use super::clause::{Condition, WhereClause};
use crate::value::{Document, Value};
use std::cmp::Ordering;

impl WhereClause {
    /// Evaluates the clause against a document.
    ///
    /// Absent and `Null` fields are treated alike. Agrees with the SQL
    /// rendering produced by [`WhereClause::to_sql`] for every validated
    /// clause.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Leaf { row, condition } => condition.matches(doc.get_present(row)),
            Self::And(clauses) => clauses.iter().all(|clause| clause.matches(doc)),
            Self::Or(clauses) => clauses.iter().any(|clause| clause.matches(doc)),
        }
    }
}

impl Condition {
    pub(crate) fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Self::Any => true,
            Self::Null => field.is_none(),
            Self::Eq(expected) => equals(field, expected),
            Self::In(values) => values.iter().any(|value| equals(field, value)),
            Self::Ne(expected) => !equals(field, expected),
            Self::Nin(values) => !values.iter().any(|value| equals(field, value)),
            Self::Gt(bound) => ordered(field, bound, |o| o == Ordering::Greater),
            Self::Gte(bound) => ordered(field, bound, |o| o != Ordering::Less),
            Self::Lt(bound) => ordered(field, bound, |o| o == Ordering::Less),
            Self::Lte(bound) => ordered(field, bound, |o| o != Ordering::Greater),
        }
    }
}

fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) => value == expected,
    }
}

fn ordered(field: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    field
        .and_then(|value| value.compare(bound))
        .is_some_and(accept)
}
