//! Conversions between document values and SQL values.
//!
//! | Row type  | Column type | Stored as          |
//! |-----------|-------------|--------------------|
//! | `string`  | `TEXT`      | text               |
//! | `number`  | `REAL`      | real               |
//! | `boolean` | `BOOLEAN`   | integer `0` or `1` |
//! | `bigint`  | `BIGINT`    | integer            |
//!
//! Absent rows are stored as `NULL`.

use crate::error::{CoreError, CoreResult};
use crate::schema::{RowDef, RowType, Table};
use crate::value::{Document, Value};
use schemadb_storage::{SqlRow, SqlValue};

pub(crate) fn encode(value: &Value) -> SqlValue {
    match value {
        Value::Null | Value::Object(_) => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Number(n) => SqlValue::Real(*n),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::BigInt(i) => SqlValue::Integer(*i),
    }
}

pub(crate) fn encode_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<SqlValue> {
    values.into_iter().map(encode).collect()
}

/// Decodes a stored value. `NULL` decodes to `None`.
pub(crate) fn decode(table: &Table, row: &RowDef, value: &SqlValue) -> CoreResult<Option<Value>> {
    let decoded = match (row.row_type, value) {
        (_, SqlValue::Null) => return Ok(None),
        (RowType::String, SqlValue::Text(s)) => Value::String(s.clone()),
        (RowType::Number, SqlValue::Real(f)) => Value::Number(*f),
        // rows written by other tools may hold integers
        #[allow(clippy::cast_precision_loss)]
        (RowType::Number, SqlValue::Integer(i)) => Value::Number(*i as f64),
        (RowType::Boolean, SqlValue::Integer(0)) => Value::Boolean(false),
        (RowType::Boolean, SqlValue::Integer(1)) => Value::Boolean(true),
        (RowType::BigInt, SqlValue::Integer(i)) => Value::BigInt(*i),
        (ty, other) => {
            return Err(CoreError::InvalidStoredValue {
                table: table.name().to_string(),
                row: row.name.clone(),
                message: format!("cannot read {other:?} as {ty}"),
            })
        }
    };
    Ok(Some(decoded))
}

/// Decodes a result row into a document, skipping `NULL` columns.
pub(crate) fn decode_doc(table: &Table, sql_row: &SqlRow) -> CoreResult<Document> {
    let mut doc = Document::new();
    for (column, value) in sql_row.iter() {
        let row = table.require_row(column)?;
        if let Some(value) = decode(table, row, value)? {
            doc.insert(column, value);
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RowDecl, Schema, TableDecl};

    fn schema() -> Schema {
        Schema::new(vec![TableDecl::new("T", "s")
            .row(RowDecl::new("s", RowType::String))
            .row(RowDecl::new("n", RowType::Number).optional())
            .row(RowDecl::new("b", RowType::Boolean).optional())
            .row(RowDecl::new("i", RowType::BigInt).optional())])
        .unwrap()
    }

    #[test]
    fn encodes_each_type() {
        assert_eq!(encode(&Value::from("x")), SqlValue::Text("x".into()));
        assert_eq!(encode(&Value::from(1.5)), SqlValue::Real(1.5));
        assert_eq!(encode(&Value::from(true)), SqlValue::Integer(1));
        assert_eq!(encode(&Value::from(9i64)), SqlValue::Integer(9));
        assert_eq!(encode(&Value::Null), SqlValue::Null);
    }

    #[test]
    fn decodes_rows() {
        let schema = schema();
        let table = schema.table("T").unwrap();
        let row = SqlRow::new(vec![
            ("s".into(), SqlValue::Text("x".into())),
            ("n".into(), SqlValue::Integer(2)),
            ("b".into(), SqlValue::Integer(0)),
            ("i".into(), SqlValue::Null),
        ]);
        let doc = decode_doc(table, &row).unwrap();
        assert_eq!(doc, crate::doc! { "s" => "x", "n" => 2.0, "b" => false });
    }

    #[test]
    fn rejects_mistyped_storage() {
        let schema = schema();
        let table = schema.table("T").unwrap();
        let row = SqlRow::new(vec![("b".into(), SqlValue::Integer(7))]);
        let err = decode_doc(table, &row).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStoredValue { ref row, .. } if row == "b"));
    }
}
