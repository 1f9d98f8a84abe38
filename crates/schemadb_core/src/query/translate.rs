//! SQL rendering of where clauses and find options.
//!
//! Every value becomes a `?` placeholder. Absent rows are stored as `NULL`,
//! so the rendering uses null-safe comparisons wherever the in-memory
//! matcher treats absent rows specially.
//!
//! Lists longer than [`INLINE_LIST_MAX`] are bound as a single JSON array
//! and expanded with `json_each`, which keeps relation lookups and large
//! `is_in` filters under SQLite's bound-parameter limit.

use super::clause::{Condition, WhereClause};
use super::options::{FindOptions, SortDirection};
use crate::value::Value;
use schemadb_storage::quote_ident;

/// A rendered SQL boolean expression and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Expression text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

impl Filter {
    fn constant(truth: bool) -> Self {
        Self {
            sql: if truth { "1" } else { "0" }.to_string(),
            params: Vec::new(),
        }
    }
}

impl WhereClause {
    /// Renders the clause as a SQL expression.
    #[must_use]
    pub fn to_sql(&self) -> Filter {
        let mut params = Vec::new();
        let sql = render(self, &mut params);
        Filter { sql, params }
    }
}

fn render(clause: &WhereClause, params: &mut Vec<Value>) -> String {
    match clause {
        WhereClause::Leaf { row, condition } => render_condition(&quote_ident(row), condition, params),
        WhereClause::And(clauses) => join(clauses, " AND ", true, params),
        WhereClause::Or(clauses) => join(clauses, " OR ", false, params),
    }
}

fn join(clauses: &[WhereClause], sep: &str, empty: bool, params: &mut Vec<Value>) -> String {
    if clauses.is_empty() {
        return Filter::constant(empty).sql;
    }
    let parts: Vec<String> = clauses.iter().map(|c| render(c, params)).collect();
    format!("({})", parts.join(sep))
}

/// Longest `IN` list rendered with one placeholder per value.
pub(crate) const INLINE_LIST_MAX: usize = 256;

// Renders the right-hand side of `IN` / `NOT IN`, parentheses included.
fn list_operand(values: &[&Value], params: &mut Vec<Value>) -> String {
    if values.len() > INLINE_LIST_MAX {
        let array: Vec<serde_json::Value> = values.iter().map(|&v| json_item(v)).collect();
        params.push(Value::String(serde_json::Value::Array(array).to_string()));
        return "(SELECT value FROM json_each(?))".to_string();
    }
    params.extend(values.iter().map(|&v| v.clone()));
    format!("({})", vec!["?"; values.len()].join(", "))
}

// json_each yields booleans as 0/1, matching how they are stored.
fn json_item(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::BigInt(i) => serde_json::Value::from(*i),
        Value::Null | Value::Object(_) => serde_json::Value::Null,
    }
}

fn binary(column: &str, op: &str, value: &Value, params: &mut Vec<Value>) -> String {
    params.push(value.clone());
    format!("{column} {op} ?")
}

fn render_condition(column: &str, condition: &Condition, params: &mut Vec<Value>) -> String {
    match condition {
        Condition::Any => "1".to_string(),
        Condition::Null => format!("{column} IS NULL"),
        Condition::Eq(value) if value.is_null() => format!("{column} IS NULL"),
        Condition::Eq(value) => binary(column, "=", value, params),
        Condition::Ne(value) => binary(column, "IS NOT", value, params),
        Condition::Gt(value) => binary(column, ">", value, params),
        Condition::Gte(value) => binary(column, ">=", value, params),
        Condition::Lt(value) => binary(column, "<", value, params),
        Condition::Lte(value) => binary(column, "<=", value, params),
        Condition::In(values) => {
            let (present, has_null) = split_nulls(values);
            match (present.is_empty(), has_null) {
                (true, false) => "0".to_string(),
                (true, true) => format!("{column} IS NULL"),
                (false, false) => format!("{column} IN {}", list_operand(&present, params)),
                (false, true) => format!(
                    "({column} IN {} OR {column} IS NULL)",
                    list_operand(&present, params)
                ),
            }
        }
        Condition::Nin(values) => {
            let (present, has_null) = split_nulls(values);
            match (present.is_empty(), has_null) {
                (true, false) => "1".to_string(),
                (true, true) => format!("{column} IS NOT NULL"),
                (false, false) => format!(
                    "({column} IS NULL OR {column} NOT IN {})",
                    list_operand(&present, params)
                ),
                (false, true) => format!(
                    "({column} IS NOT NULL AND {column} NOT IN {})",
                    list_operand(&present, params)
                ),
            }
        }
    }
}

fn split_nulls(values: &[Value]) -> (Vec<&Value>, bool) {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    let has_null = present.len() != values.len();
    (present, has_null)
}

/// Renders `ORDER BY`, `LIMIT` and `OFFSET` for a find.
///
/// Ties, and finds without an ordering, fall back to `rowid` so results come
/// back in insertion order.
pub(crate) fn render_tail(options: &FindOptions) -> String {
    let mut tail = match &options.order_by {
        Some(order) => {
            let direction = match order.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!(" ORDER BY {} {direction}, rowid", quote_ident(&order.row))
        }
        None => " ORDER BY rowid".to_string(),
    };
    // SQLite rejects integers above i64::MAX
    let clamp = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    match (options.limit.map(clamp), options.offset.map(clamp)) {
        (Some(limit), Some(offset)) => tail.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => tail.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => tail.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
    tail
}
