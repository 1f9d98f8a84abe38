//! Opening existing SQLite files with a changed schema.

use schemadb_core::{
    doc, Config, Connector, CoreError, RowDecl, RowType, Schema, TableDecl, Value, WhereClause,
};
use schemadb_testkit::{blog_schema, blog_tables, user, TestSqlDatabase};

fn with_user_row(row: RowDecl) -> Schema {
    let mut tables = blog_tables();
    tables[0] = tables[0].clone().row(row);
    Schema::new(tables).unwrap()
}

#[test]
fn fresh_file_creates_every_table() {
    schemadb_testkit::init_tracing();
    let file = TestSqlDatabase::new();
    let db = file.open(blog_schema()).unwrap();
    assert_eq!(
        db.migration_report().created,
        vec!["User", "Post", "Comment", "Membership"]
    );
    assert!(db.migration_report().rebuilt.is_empty());
}

#[test]
fn adding_a_defaulted_row_keeps_existing_documents() {
    schemadb_testkit::init_tracing();
    let file = TestSqlDatabase::new();
    {
        let db = file.open(blog_schema()).unwrap();
        db.create_many("User", (0..25).map(user).collect()).unwrap();
        db.close().unwrap();
    }

    let schema = with_user_row(RowDecl::new("level", RowType::BigInt).default(1i64));
    let db = file
        .open_with_config(schema, Config::default().migration_batch_size(10))
        .unwrap();

    let report = db.migration_report();
    assert!(report.created.is_empty());
    assert_eq!(report.rebuilt.len(), 1);
    assert_eq!(report.rebuilt[0].table, "User");
    assert_eq!(report.rebuilt[0].rows_copied, 25);
    assert_eq!(report.rebuilt[0].batches, 3);

    assert_eq!(
        db.count("User", &WhereClause::eq("level", 1i64)).unwrap(),
        25
    );
    let first = db.find_one("User", Default::default()).unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::from("u0")));

    // constraints survive the rebuild
    let err = db.create("User", user(3)).unwrap_err();
    assert!(err.is_unique_violation());
}

#[test]
fn adding_an_optional_row_and_dropping_another() {
    let file = TestSqlDatabase::new();
    {
        let db = file.open(blog_schema()).unwrap();
        db.create("User", user(1).with("karma", 5i64)).unwrap();
    }

    let mut tables = blog_tables();
    let mut user_table = TableDecl::new("User", "id");
    for row in [
        RowDecl::new("id", RowType::String),
        RowDecl::new("email", RowType::String).unique(),
        RowDecl::new("name", RowType::String),
        RowDecl::new("bio", RowType::String).optional(),
    ] {
        user_table = user_table.row(row);
    }
    tables[0] = user_table;
    let db = file.open(Schema::new(tables).unwrap()).unwrap();

    let u1 = db.find_one("User", Default::default()).unwrap().unwrap();
    assert_eq!(
        u1,
        doc! { "id" => "u1", "email" => "u1@example.com", "name" => "User 1" }
    );
}

#[test]
fn required_row_without_default_is_rejected_before_any_change() {
    let file = TestSqlDatabase::new();
    {
        let db = file.open(blog_schema()).unwrap();
        db.create("User", user(1)).unwrap();
    }

    let schema = with_user_row(RowDecl::new("level", RowType::BigInt));
    let err = file.open(schema).unwrap_err();
    assert!(matches!(
        err,
        CoreError::MigrationIncompatible { ref table, ref row } if table == "User" && row == "level"
    ));

    let db = file.open(blog_schema()).unwrap();
    assert!(db.migration_report().is_noop());
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
}

fn tags(email: RowDecl) -> Schema {
    Schema::new(vec![TableDecl::new("Tag", "id")
        .row(RowDecl::new("id", RowType::String))
        .row(email)])
    .unwrap()
}

#[test]
fn making_a_row_unique_rebuilds_the_table() {
    schemadb_testkit::init_tracing();
    let file = TestSqlDatabase::new();
    {
        let db = file.open(tags(RowDecl::new("email", RowType::String))).unwrap();
        db.create("Tag", doc! { "id" => "t1", "email" => "a@x" }).unwrap();
    }

    let db = file
        .open(tags(RowDecl::new("email", RowType::String).unique()))
        .unwrap();
    let report = db.migration_report();
    assert_eq!(report.rebuilt.len(), 1);
    assert_eq!(report.rebuilt[0].rows_copied, 1);

    let err = db
        .create("Tag", doc! { "id" => "t2", "email" => "a@x" })
        .unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
    db.close().unwrap();

    let db = file
        .open(tags(RowDecl::new("email", RowType::String).unique()))
        .unwrap();
    assert!(db.migration_report().is_noop());
}

#[test]
fn duplicates_block_a_new_unique_constraint() {
    let file = TestSqlDatabase::new();
    {
        let db = file.open(tags(RowDecl::new("email", RowType::String))).unwrap();
        db.create_many(
            "Tag",
            vec![
                doc! { "id" => "t1", "email" => "a@x" },
                doc! { "id" => "t2", "email" => "a@x" },
            ],
        )
        .unwrap();
    }

    let err = file
        .open(tags(RowDecl::new("email", RowType::String).unique()))
        .unwrap_err();
    assert!(matches!(err, CoreError::MigrationFailed { .. }), "{err}");

    let db = file.open(tags(RowDecl::new("email", RowType::String))).unwrap();
    assert!(db.migration_report().is_noop());
    assert_eq!(db.count("Tag", &WhereClause::all()).unwrap(), 2);
}

#[test]
fn unchanged_blog_schema_reopens_without_work() {
    let file = TestSqlDatabase::new();
    file.open(blog_schema()).unwrap().close().unwrap();
    assert!(file.open(blog_schema()).unwrap().migration_report().is_noop());
}

#[test]
fn new_tables_are_created_alongside_existing_ones() {
    let file = TestSqlDatabase::new();
    {
        let mut tables = blog_tables();
        tables.truncate(1);
        let db = file.open(Schema::new(tables).unwrap()).unwrap();
        db.create("User", user(1)).unwrap();
    }

    let db = file.open(blog_schema()).unwrap();
    assert_eq!(
        db.migration_report().created,
        vec!["Post", "Comment", "Membership"]
    );
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
}

#[test]
fn close_and_wipe_empties_the_file() {
    let file = TestSqlDatabase::new();
    {
        let db = file.open(blog_schema()).unwrap();
        db.create("User", user(1)).unwrap();
        db.close_and_wipe().unwrap();
        assert!(matches!(
            db.count("User", &WhereClause::all()),
            Err(CoreError::DatabaseClosed)
        ));
    }
    let db = file.open(blog_schema()).unwrap();
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 0);
}
