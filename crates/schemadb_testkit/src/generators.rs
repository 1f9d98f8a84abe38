//! Property-based test generators using proptest.
//!
//! Values are drawn from deliberately small domains so that generated
//! documents collide on unique rows and generated clauses actually select
//! something.

use schemadb_core::{Document, RowType, Value, WhereClause};
use proptest::prelude::*;

/// Strategy for a non-null value of `row_type`.
///
/// Numbers are small integers so both backends compare them exactly.
pub fn value_strategy(row_type: RowType) -> BoxedStrategy<Value> {
    match row_type {
        RowType::String => prop::sample::select(vec!["a", "b", "c", "d"])
            .prop_map(Value::from)
            .boxed(),
        RowType::Number => (-3i32..4).prop_map(|n| Value::Number(f64::from(n))).boxed(),
        RowType::Boolean => any::<bool>().prop_map(Value::from).boxed(),
        RowType::BigInt => (-3i64..4).prop_map(Value::from).boxed(),
    }
}

/// Strategy for a value of `row_type` or null.
pub fn nullable_value_strategy(row_type: RowType) -> BoxedStrategy<Value> {
    prop_oneof![
        1 => Just(Value::Null),
        4 => value_strategy(row_type),
    ]
    .boxed()
}

/// Row names and types of the `User` table in [`crate::blog_schema`].
pub const USER_ROWS: [(&str, RowType); 6] = [
    ("id", RowType::String),
    ("email", RowType::String),
    ("name", RowType::String),
    ("age", RowType::Number),
    ("admin", RowType::Boolean),
    ("karma", RowType::BigInt),
];

/// Strategy for a valid `User` document.
///
/// `id` and `email` come from a small pool, so batches of generated users
/// regularly violate the primary key or the unique email.
pub fn user_strategy() -> impl Strategy<Value = Document> {
    (
        0u8..6,
        0u8..6,
        value_strategy(RowType::String),
        prop::option::of(value_strategy(RowType::Number)),
        prop::option::of(value_strategy(RowType::Boolean)),
        prop::option::of(value_strategy(RowType::BigInt)),
    )
        .prop_map(|(id, email, name, age, admin, karma)| {
            let mut doc = Document::new()
                .with("id", format!("u{id}"))
                .with("email", format!("e{email}"))
                .with("name", name);
            for (row, value) in [("age", age), ("admin", admin), ("karma", karma)] {
                if let Some(value) = value {
                    doc.insert(row, value);
                }
            }
            doc
        })
}

/// Strategy for a batch of `User` documents.
pub fn users_strategy(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(user_strategy(), 0..=max)
}

fn leaf_strategy() -> BoxedStrategy<WhereClause> {
    prop::sample::select(USER_ROWS.to_vec())
        .prop_flat_map(|(row, row_type)| {
            let values = prop::collection::vec(nullable_value_strategy(row_type), 0..3);
            prop_oneof![
                nullable_value_strategy(row_type).prop_map(move |v| WhereClause::eq(row, v)),
                nullable_value_strategy(row_type).prop_map(move |v| WhereClause::ne(row, v)),
                values.clone().prop_map(move |vs| WhereClause::is_in(row, vs)),
                values.prop_map(move |vs| WhereClause::not_in(row, vs)),
                value_strategy(row_type).prop_map(move |v| WhereClause::gt(row, v)),
                value_strategy(row_type).prop_map(move |v| WhereClause::gte(row, v)),
                value_strategy(row_type).prop_map(move |v| WhereClause::lt(row, v)),
                value_strategy(row_type).prop_map(move |v| WhereClause::lte(row, v)),
                Just(WhereClause::is_null(row)),
                Just(WhereClause::any(row)),
            ]
        })
        .boxed()
}

/// Strategy for a where clause over the `User` table, nested up to three
/// levels of `AND`/`OR`.
pub fn where_clause_strategy() -> impl Strategy<Value = WhereClause> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(WhereClause::and),
            prop::collection::vec(inner, 0..4).prop_map(WhereClause::or),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    proptest! {
        #[test]
        fn generated_users_are_valid(user in user_strategy()) {
            let schema = crate::blog_schema();
            let table = schema.table("User").unwrap();
            for (row, value) in user.iter() {
                let def = table.row(row).unwrap();
                prop_assert!(value.is_type(def.row_type));
            }
        }

        #[test]
        fn generated_clauses_validate(clause in where_clause_strategy()) {
            let schema = crate::blog_schema();
            prop_assert!(clause.validate(schema.table("User").unwrap()).is_ok());
        }
    }

    #[test]
    fn value_strategy_matches_type() {
        let mut runner = TestRunner::default();
        for (_, row_type) in USER_ROWS {
            let value = value_strategy(row_type).new_tree(&mut runner).unwrap().current();
            assert_eq!(value.row_type(), Some(row_type));
        }
    }
}
