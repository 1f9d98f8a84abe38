//! Batched relation loading.

use crate::error::CoreResult;
use crate::query::{FindOptions, Include, WhereClause};
use crate::schema::{Schema, Table};
use crate::value::{Document, Value, ValueKey};
use std::collections::{HashMap, HashSet};

/// Attaches included relations to `docs`.
///
/// Each relation costs one call to `fetch`, whatever the number of
/// documents. Nested includes are passed down through the fetched
/// [`FindOptions`], so `fetch` resolves them with the same batching. A
/// document whose local value is absent or unmatched gets `Null`.
pub(crate) fn load_relations<F>(
    schema: &Schema,
    table: &Table,
    docs: &mut [Document],
    include: &Include,
    fetch: &mut F,
) -> CoreResult<()>
where
    F: FnMut(&Table, FindOptions) -> CoreResult<Vec<Document>>,
{
    if docs.is_empty() {
        return Ok(());
    }

    for (name, nested) in include.iter() {
        let relation = table.relation(name)?;
        let foreign = schema.table(&relation.foreign_table)?;

        let mut seen = HashSet::new();
        let values: Vec<Value> = docs
            .iter()
            .filter_map(|doc| doc.get_present(&relation.local_field))
            .filter(|value| value.key().is_some_and(|key| seen.insert(key)))
            .cloned()
            .collect();

        let mut related: HashMap<ValueKey, Document> = HashMap::new();
        if !values.is_empty() {
            let options = FindOptions::new(WhereClause::is_in(&relation.foreign_field, values))
                .include(nested.clone());
            for found in fetch(foreign, options)? {
                if let Some(key) = found.get_present(&relation.foreign_field).and_then(Value::key) {
                    related.entry(key).or_insert(found);
                }
            }
        }
        tracing::trace!(
            table = table.name(),
            relation = name,
            matched = related.len(),
            "loaded relation"
        );

        for doc in docs.iter_mut() {
            let value = doc
                .get_present(&relation.local_field)
                .and_then(Value::key)
                .and_then(|key| related.get(&key))
                .map_or(Value::Null, |found| Value::Object(found.clone()));
            doc.insert(name, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::schema::{RelationDecl, RowDecl, RowType, TableDecl};

    fn schema() -> Schema {
        Schema::new(vec![
            TableDecl::new("User", "id").row(RowDecl::new("id", RowType::String)),
            TableDecl::new("Post", "id")
                .row(RowDecl::new("id", RowType::String))
                .row(RowDecl::new("authorId", RowType::String).optional())
                .row(RowDecl::relation("author", RelationDecl::new("authorId", "User", "id"))),
        ])
        .unwrap()
    }

    #[test]
    fn one_fetch_per_relation() {
        let schema = schema();
        let users = vec![doc! { "id" => "u1" }, doc! { "id" => "u2" }];
        let mut posts = vec![
            doc! { "id" => "p1", "authorId" => "u1" },
            doc! { "id" => "p2", "authorId" => "u1" },
            doc! { "id" => "p3", "authorId" => "u9" },
            doc! { "id" => "p4" },
        ];

        let mut calls = Vec::new();
        let mut fetch = |foreign: &Table, options: FindOptions| -> CoreResult<Vec<Document>> {
            calls.push((foreign.name().to_string(), options.where_clause.clone()));
            Ok(users
                .iter()
                .filter(|u| options.where_clause.matches(u))
                .cloned()
                .collect())
        };
        load_relations(
            &schema,
            schema.table("Post").unwrap(),
            &mut posts,
            &Include::new().with("author"),
            &mut fetch,
        )
        .unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            ("User".to_string(), WhereClause::is_in("id", ["u1", "u9"]))
        );
        assert_eq!(posts[0].related("author"), Some(&doc! { "id" => "u1" }));
        assert_eq!(posts[1].related("author"), Some(&doc! { "id" => "u1" }));
        assert_eq!(posts[2].get("author"), Some(&Value::Null));
        assert_eq!(posts[3].get("author"), Some(&Value::Null));
    }

    #[test]
    fn no_local_values_skips_fetch() {
        let schema = schema();
        let mut posts = vec![doc! { "id" => "p1" }];
        let mut fetch = |_: &Table, _: FindOptions| -> CoreResult<Vec<Document>> {
            panic!("nothing to fetch")
        };
        load_relations(
            &schema,
            schema.table("Post").unwrap(),
            &mut posts,
            &Include::new().with("author"),
            &mut fetch,
        )
        .unwrap();
        assert_eq!(posts[0].get("author"), Some(&Value::Null));
    }

    #[test]
    fn unknown_relation() {
        let schema = schema();
        let mut posts = vec![doc! { "id" => "p1" }];
        let mut fetch = |_: &Table, _: FindOptions| -> CoreResult<Vec<Document>> { Ok(Vec::new()) };
        let err = load_relations(
            &schema,
            schema.table("Post").unwrap(),
            &mut posts,
            &Include::new().with("editor"),
            &mut fetch,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unable to find relation editor in table Post");
    }
}
