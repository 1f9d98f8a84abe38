//! Where clauses and find options.
//!
//! A [`WhereClause`] has two renderings that must agree on every input:
//! [`WhereClause::matches`] evaluates it against an in-memory document and
//! [`WhereClause::to_sql`] compiles it into a parameterized SQL expression.

mod clause;
mod matcher;
mod options;
mod translate;

pub use clause::{Condition, WhereClause};
pub use options::{FindOptions, Include, OrderBy, SortDirection};
pub use translate::Filter;

pub(crate) use translate::render_tail;
