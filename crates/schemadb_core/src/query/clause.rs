//! Where clause tree, builders and validation.

use crate::error::{CoreError, CoreResult};
use crate::schema::Table;
use crate::value::Value;

/// A condition on one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every document.
    Any,
    /// Row is absent.
    Null,
    /// Row equals the value.
    Eq(Value),
    /// Row is one of the values. A `Null` member matches absent rows.
    In(Vec<Value>),
    /// Row differs from the value. Absent rows differ from every non-null value.
    Ne(Value),
    /// Row is none of the values. A `Null` member excludes absent rows.
    Nin(Vec<Value>),
    /// Row is greater than the value.
    Gt(Value),
    /// Row is greater than or equal to the value.
    Gte(Value),
    /// Row is less than the value.
    Lt(Value),
    /// Row is less than or equal to the value.
    Lte(Value),
}

impl Condition {
    fn values(&self) -> &[Value] {
        match self {
            Self::Any | Self::Null => &[],
            Self::In(values) | Self::Nin(values) => values,
            Self::Eq(value)
            | Self::Ne(value)
            | Self::Gt(value)
            | Self::Gte(value)
            | Self::Lt(value)
            | Self::Lte(value) => std::slice::from_ref(value),
        }
    }
}

/// A boolean predicate over a table's rows.
///
/// ```rust
/// use schemadb_core::WhereClause;
///
/// let clause = WhereClause::or(vec![
///     WhereClause::eq("name", "alice"),
///     WhereClause::and(vec![WhereClause::gte("age", 18), WhereClause::is_null("banned")]),
/// ]);
/// # let _ = clause;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// A condition on one row.
    Leaf {
        /// Row name.
        row: String,
        /// Condition on that row.
        condition: Condition,
    },
    /// All children hold. Empty is true.
    And(Vec<WhereClause>),
    /// Some child holds. Empty is false.
    Or(Vec<WhereClause>),
}

impl Default for WhereClause {
    fn default() -> Self {
        Self::all()
    }
}

impl WhereClause {
    fn leaf(row: impl Into<String>, condition: Condition) -> Self {
        Self::Leaf {
            row: row.into(),
            condition,
        }
    }

    /// Matches every document.
    #[must_use]
    pub fn all() -> Self {
        Self::And(Vec::new())
    }

    /// Row equals `value`; a null value means the row is absent.
    pub fn eq(row: impl Into<String>, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::leaf(row, Condition::Null),
            value => Self::leaf(row, Condition::Eq(value)),
        }
    }

    /// Row is one of `values`.
    pub fn is_in<V: Into<Value>>(row: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::leaf(row, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    /// Row is absent.
    pub fn is_null(row: impl Into<String>) -> Self {
        Self::leaf(row, Condition::Null)
    }

    /// Matches anything, but still requires the row to exist in the table.
    pub fn any(row: impl Into<String>) -> Self {
        Self::leaf(row, Condition::Any)
    }

    /// Row differs from `value`.
    pub fn ne(row: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(row, Condition::Ne(value.into()))
    }

    /// Row is none of `values`.
    pub fn not_in<V: Into<Value>>(
        row: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::leaf(row, Condition::Nin(values.into_iter().map(Into::into).collect()))
    }

    /// Row is greater than `value`.
    pub fn gt(row: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(row, Condition::Gt(value.into()))
    }

    /// Row is at least `value`.
    pub fn gte(row: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(row, Condition::Gte(value.into()))
    }

    /// Row is less than `value`.
    pub fn lt(row: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(row, Condition::Lt(value.into()))
    }

    /// Row is at most `value`.
    pub fn lte(row: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(row, Condition::Lte(value.into()))
    }

    /// Conjunction.
    #[must_use]
    pub fn and(clauses: Vec<WhereClause>) -> Self {
        Self::And(clauses)
    }

    /// Disjunction.
    #[must_use]
    pub fn or(clauses: Vec<WhereClause>) -> Self {
        Self::Or(clauses)
    }

    /// Conjoins another clause onto this one.
    #[must_use]
    pub fn and_where(self, other: WhereClause) -> Self {
        match self {
            Self::And(mut clauses) => {
                clauses.push(other);
                Self::And(clauses)
            }
            clause => Self::And(vec![clause, other]),
        }
    }

    /// Checks that every row exists in `table` and every value has its row's type.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownRow`] or [`CoreError::UnrecognizedValue`].
    pub fn validate(&self, table: &Table) -> CoreResult<()> {
        match self {
            Self::Leaf { row, condition } => {
                let def = table.require_row(row)?;
                for value in condition.values() {
                    if !value.is_null() && !value.is_type(def.row_type) {
                        return Err(CoreError::unrecognized_value(
                            table.name(),
                            row,
                            def.row_type.as_str(),
                        ));
                    }
                }
                Ok(())
            }
            Self::And(clauses) | Self::Or(clauses) => {
                clauses.iter().try_for_each(|clause| clause.validate(table))
            }
        }
    }

    /// Parses a clause from JSON.
    ///
    /// Objects conjoin their keys. `AND` and `OR` take arrays of clauses.
    /// Any other key names a row: `null` means absent, an array means
    /// "one of", an object holds a single operator (`eq`, `ne`, `in`, `nin`,
    /// `gt`, `gte`, `lt`, `lte`), and any other scalar means equality.
    ///
    /// ```rust
    /// use schemadb_core::WhereClause;
    /// use serde_json::json;
    ///
    /// let clause = WhereClause::from_json(&json!({ "age": { "gt": 30 }, "deleted": null })).unwrap();
    /// assert_eq!(
    ///     clause,
    ///     WhereClause::and(vec![WhereClause::gt("age", 30), WhereClause::is_null("deleted")])
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidWhere`] for malformed input.
    pub fn from_json(json: &serde_json::Value) -> CoreResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| CoreError::invalid_where("expected an object"))?;

        let mut clauses = object
            .iter()
            .map(|(key, value)| match key.as_str() {
                "AND" => Ok(Self::And(parse_list(key, value)?)),
                "OR" => Ok(Self::Or(parse_list(key, value)?)),
                row => Ok(Self::leaf(row, parse_condition(row, value)?)),
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Self::And(clauses)
        })
    }
}

impl TryFrom<&serde_json::Value> for WhereClause {
    type Error = CoreError;

    fn try_from(json: &serde_json::Value) -> CoreResult<Self> {
        Self::from_json(json)
    }
}

fn parse_list(key: &str, json: &serde_json::Value) -> CoreResult<Vec<WhereClause>> {
    json.as_array()
        .ok_or_else(|| CoreError::invalid_where(format!("{key} expects an array")))?
        .iter()
        .map(WhereClause::from_json)
        .collect()
}

fn parse_scalar(row: &str, json: &serde_json::Value) -> CoreResult<Value> {
    Value::from_json(json)
        .ok_or_else(|| CoreError::invalid_where(format!("{row}: expected a scalar value")))
}

fn parse_scalars(row: &str, json: &serde_json::Value) -> CoreResult<Vec<Value>> {
    json.as_array()
        .ok_or_else(|| CoreError::invalid_where(format!("{row}: expected an array")))?
        .iter()
        .map(|item| parse_scalar(row, item))
        .collect()
}

fn parse_condition(row: &str, json: &serde_json::Value) -> CoreResult<Condition> {
    match json {
        serde_json::Value::Null => Ok(Condition::Null),
        serde_json::Value::Array(_) => Ok(Condition::In(parse_scalars(row, json)?)),
        serde_json::Value::Object(ops) => {
            let mut ops = ops.iter();
            let (op, arg) = match (ops.next(), ops.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(CoreError::invalid_where(format!(
                        "{row}: expected exactly one operator"
                    )))
                }
            };
            Ok(match op.as_str() {
                "eq" => match parse_scalar(row, arg)? {
                    Value::Null => Condition::Null,
                    value => Condition::Eq(value),
                },
                "ne" => Condition::Ne(parse_scalar(row, arg)?),
                "in" => Condition::In(parse_scalars(row, arg)?),
                "nin" => Condition::Nin(parse_scalars(row, arg)?),
                "gt" => Condition::Gt(parse_scalar(row, arg)?),
                "gte" => Condition::Gte(parse_scalar(row, arg)?),
                "lt" => Condition::Lt(parse_scalar(row, arg)?),
                "lte" => Condition::Lte(parse_scalar(row, arg)?),
                other => {
                    return Err(CoreError::invalid_where(format!(
                        "{row}: unknown operator {other}"
                    )))
                }
            })
        }
        scalar => Ok(Condition::Eq(parse_scalar(row, scalar)?)),
    }
}
