//! Benchmark utilities.

#![warn(missing_docs)]

use schemadb_core::{Connector, Document, Value};
use schemadb_testkit::{post, user};

/// `count` users, every third one with an age.
pub fn users(count: usize) -> Vec<Document> {
    (0..count)
        .map(|n| {
            let doc = user(n);
            if n % 3 == 0 {
                #[allow(clippy::cast_precision_loss)]
                doc.with("age", Value::Number((n % 90) as f64))
            } else {
                doc
            }
        })
        .collect()
}

/// Fills `db` with `count` users and one post per user.
pub fn populate<C: Connector>(db: &C, count: usize) {
    db.create_many("User", users(count))
        .expect("Failed to create users");
    db.create_many("Post", (0..count).map(|n| post(n, n)).collect())
        .expect("Failed to create posts");
}
