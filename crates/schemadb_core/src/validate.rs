//! Document and patch validation shared by both connectors.

use crate::error::{CoreError, CoreResult};
use crate::schema::{DefaultValue, RowDef, Table};
use crate::value::{Document, Value};

/// Checks a new document and fills in defaults.
///
/// Checks run in order: field names, value types, defaults, required rows.
/// Explicit nulls are dropped, so the returned document only holds present
/// values.
pub(crate) fn prepare_create(table: &Table, doc: Document) -> CoreResult<Document> {
    let mut prepared = Document::new();
    for (key, value) in doc {
        let row = table.require_row(&key)?;
        if value.is_null() {
            continue;
        }
        check_type(table, row, &value)?;
        prepared.insert(key, value);
    }

    for row in table.rows() {
        if prepared.contains_key(&row.name) {
            continue;
        }
        match &row.default {
            Some(default) => {
                prepared.insert(row.name.clone(), default_value(table, row, default)?);
            }
            None if !row.optional => return Err(CoreError::missing_value(table.name(), &row.name)),
            None => {}
        }
    }
    Ok(prepared)
}

/// Checks an update patch.
///
/// `Null` clears a row, which is only allowed for optional rows.
pub(crate) fn prepare_patch(table: &Table, patch: &Document) -> CoreResult<()> {
    for (key, value) in patch {
        let row = table.require_row(key)?;
        if value.is_null() {
            if !row.optional {
                return Err(CoreError::missing_value(table.name(), key));
            }
            continue;
        }
        check_type(table, row, value)?;
    }
    Ok(())
}

/// Produces a row's default, checking producer output.
pub(crate) fn default_value(table: &Table, row: &RowDef, default: &DefaultValue) -> CoreResult<Value> {
    let value = default.produce();
    if !value.is_type(row.row_type) {
        return Err(CoreError::DefaultProducerMismatch {
            table: table.name().to_string(),
            row: row.name.clone(),
            expected: row.row_type.to_string(),
        });
    }
    Ok(value)
}

fn check_type(table: &Table, row: &RowDef, value: &Value) -> CoreResult<()> {
    if value.is_type(row.row_type) {
        Ok(())
    } else {
        Err(CoreError::unrecognized_value(
            table.name(),
            &row.name,
            row.row_type.as_str(),
        ))
    }
}
