//! SQL statement builders.

use super::codec::{encode, encode_all};
use crate::query::{render_tail, FindOptions, WhereClause};
use crate::schema::{RowType, Table};
use crate::value::Document;
use schemadb_storage::{quote_ident, Statement};

/// Column type for a row type.
///
/// `INTEGER` is avoided on purpose: a lone `INTEGER PRIMARY KEY` would alias
/// the rowid.
pub(crate) fn column_type(row_type: RowType) -> &'static str {
    match row_type {
        RowType::String => "TEXT",
        RowType::Number => "REAL",
        RowType::Boolean => "BOOLEAN",
        RowType::BigInt => "BIGINT",
    }
}

/// `CREATE TABLE` for `table`, under `name` (the table's own name or a
/// shadow name while migrating).
pub(crate) fn create_table(table: &Table, name: &str) -> Statement {
    let mut parts: Vec<String> = table
        .rows()
        .iter()
        .map(|row| {
            let mut column = format!("{} {}", quote_ident(&row.name), column_type(row.row_type));
            if !row.optional {
                column.push_str(" NOT NULL");
            }
            if row.unique {
                column.push_str(" UNIQUE");
            }
            column
        })
        .collect();
    let key: Vec<String> = table.primary_key().iter().map(|row| quote_ident(row)).collect();
    parts.push(format!("PRIMARY KEY ({})", key.join(", ")));

    Statement::new(format!(
        "CREATE TABLE {} ({})",
        quote_ident(name),
        parts.join(", ")
    ))
}

pub(crate) fn list_tables() -> Statement {
    Statement::new(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
}

pub(crate) fn table_columns(name: &str) -> Statement {
    Statement::new(format!("PRAGMA table_info({})", quote_ident(name)))
}

pub(crate) fn index_list(table: &str) -> Statement {
    Statement::new(format!("PRAGMA index_list({})", quote_ident(table)))
}

pub(crate) fn index_columns(index: &str) -> Statement {
    Statement::new(format!("PRAGMA index_info({})", quote_ident(index)))
}

pub(crate) fn drop_table(name: &str) -> Statement {
    Statement::new(format!("DROP TABLE {}", quote_ident(name)))
}

pub(crate) fn rename_table(from: &str, to: &str) -> Statement {
    Statement::new(format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(from),
        quote_ident(to)
    ))
}

/// `INSERT` of the document's present values into table `name`.
pub(crate) fn insert(name: &str, doc: &Document) -> Statement {
    if doc.is_empty() {
        return Statement::new(format!("INSERT INTO {} DEFAULT VALUES", quote_ident(name)));
    }
    let columns: Vec<String> = doc.keys().map(quote_ident).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    Statement::with_params(
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(name),
            columns.join(", ")
        ),
        doc.iter().map(|(_, value)| encode(value)).collect(),
    )
}

/// `SELECT` of the listed columns of table `name`, in storage order,
/// `limit` rows from `offset`.
pub(crate) fn select_page(name: &str, columns: &[&str], limit: usize, offset: usize) -> Statement {
    let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    Statement::new(format!(
        "SELECT {} FROM {} ORDER BY rowid LIMIT {limit} OFFSET {offset}",
        columns.join(", "),
        quote_ident(name)
    ))
}

fn column_list(table: &Table) -> String {
    table
        .rows()
        .iter()
        .map(|row| quote_ident(&row.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn select(table: &Table, options: &FindOptions) -> Statement {
    let filter = options.where_clause.to_sql();
    Statement::with_params(
        format!(
            "SELECT {} FROM {} WHERE {}{}",
            column_list(table),
            quote_ident(table.name()),
            filter.sql,
            render_tail(options)
        ),
        encode_all(&filter.params),
    )
}

/// Result column holding the count.
pub(crate) const COUNT_COLUMN: &str = "count";

pub(crate) fn count(table: &Table, where_clause: &WhereClause) -> Statement {
    let filter = where_clause.to_sql();
    Statement::with_params(
        format!(
            "SELECT COUNT(*) AS {} FROM {} WHERE {}",
            quote_ident(COUNT_COLUMN),
            quote_ident(table.name()),
            filter.sql
        ),
        encode_all(&filter.params),
    )
}

/// `UPDATE` setting every patch entry. Null entries set `NULL`.
pub(crate) fn update(table: &Table, where_clause: &WhereClause, patch: &Document) -> Statement {
    let filter = where_clause.to_sql();
    let assignments: Vec<String> = patch
        .keys()
        .map(|row| format!("{} = ?", quote_ident(row)))
        .collect();
    let mut params = encode_all(patch.iter().map(|(_, value)| value));
    params.extend(encode_all(&filter.params));
    Statement::with_params(
        format!(
            "UPDATE {} SET {} WHERE {}",
            quote_ident(table.name()),
            assignments.join(", "),
            filter.sql
        ),
        params,
    )
}

pub(crate) fn delete(table: &Table, where_clause: &WhereClause) -> Statement {
    let filter = where_clause.to_sql();
    Statement::with_params(
        format!("DELETE FROM {} WHERE {}", quote_ident(table.name()), filter.sql),
        encode_all(&filter.params),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::query::OrderBy;
    use crate::schema::{RowDecl, Schema, TableDecl};
    use schemadb_storage::SqlValue;

    fn schema() -> Schema {
        Schema::new(vec![TableDecl::new("User", "id")
            .row(RowDecl::new("id", RowType::String))
            .row(RowDecl::new("email", RowType::String).unique())
            .row(RowDecl::new("age", RowType::Number).optional())])
        .unwrap()
    }

    #[test]
    fn create_table_ddl() {
        let schema = schema();
        let stmt = create_table(schema.table("User").unwrap(), "User");
        assert_eq!(
            stmt.sql,
            r#"CREATE TABLE "User" ("id" TEXT NOT NULL, "email" TEXT NOT NULL UNIQUE, "age" REAL, PRIMARY KEY ("id"))"#
        );
    }

    #[test]
    fn insert_binds_present_values() {
        let stmt = insert("User", &doc! { "id" => "a", "age" => 3 });
        assert_eq!(stmt.sql, r#"INSERT INTO "User" ("age", "id") VALUES (?, ?)"#);
        assert_eq!(
            stmt.params,
            vec![SqlValue::Real(3.0), SqlValue::Text("a".into())]
        );
    }

    #[test]
    fn select_with_filter_and_tail() {
        let schema = schema();
        let options = FindOptions::new(WhereClause::gt("age", 18))
            .order_by(OrderBy::asc("email"))
            .limit(5);
        let stmt = select(schema.table("User").unwrap(), &options);
        assert_eq!(
            stmt.sql,
            r#"SELECT "id", "email", "age" FROM "User" WHERE "age" > ? ORDER BY "email" ASC, rowid LIMIT 5"#
        );
        assert_eq!(stmt.params, vec![SqlValue::Real(18.0)]);
    }

    #[test]
    fn update_binds_patch_before_filter() {
        let schema = schema();
        let stmt = update(
            schema.table("User").unwrap(),
            &WhereClause::eq("id", "a"),
            &doc! { "age" => crate::Value::Null, "email" => "b@x" },
        );
        assert_eq!(
            stmt.sql,
            r#"UPDATE "User" SET "age" = ?, "email" = ? WHERE "id" = ?"#
        );
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Null,
                SqlValue::Text("b@x".into()),
                SqlValue::Text("a".into())
            ]
        );
    }
}
