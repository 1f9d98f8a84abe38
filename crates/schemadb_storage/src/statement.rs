//! Statements, parameter values and result rows.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use std::fmt;

/// A value bound to a statement parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl SqlValue {
    /// Returns true for `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub(crate) fn from_ref(value: ValueRef<'_>, column: &str) -> Option<Self> {
        match value {
            ValueRef::Null => Some(Self::Null),
            ValueRef::Integer(i) => Some(Self::Integer(i)),
            ValueRef::Real(f) => Some(Self::Real(f)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(|s| Self::Text(s.to_string())),
            ValueRef::Blob(_) => {
                tracing::debug!(column, "blob column is not representable");
                None
            }
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A SQL statement with positional `?` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Parameters, bound in order.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a statement with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {} param(s)", self.sql, self.params.len())
    }
}

/// One result row: column names paired with values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    /// Creates a row from `(column, value)` pairs.
    #[must_use]
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Returns the value of a column by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Quotes an identifier for use in SQL text.
///
/// Embedded double quotes are doubled.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_plain_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn row_lookup_by_name() {
        let row = SqlRow::new(vec![
            ("id".into(), SqlValue::Integer(1)),
            ("name".into(), SqlValue::Text("a".into())),
        ]);
        assert_eq!(row.get("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn statement_display_counts_params() {
        let stmt = Statement::with_params("SELECT ?", vec![SqlValue::Null]);
        assert_eq!(stmt.to_string(), "SELECT ? -- 1 param(s)");
    }
}
