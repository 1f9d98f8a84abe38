//! Test fixtures and connector helpers.
//!
//! Every fixture builds on [`blog_schema`], which covers each row type,
//! unique rows, defaults, a compound primary key and two levels of
//! relations.

use schemadb_core::{
    doc, Config, Document, MemoryConnector, RelationDecl, RowDecl, RowType, Schema, SqlConnector,
    TableDecl,
};
use schemadb_storage::{RecordingStore, SqliteStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Users, their posts, comments on posts and group memberships.
///
/// - `User`: `id`, unique `email`, `name`, optional `age` and `karma`,
///   `admin` defaulting to false
/// - `Post`: `id`, `authorId`, `title`, `views` defaulting to 0, relation
///   `author` to `User.id`
/// - `Comment`: `id`, `postId`, `body`, relation `post` to `Post.id`
/// - `Membership`: compound key (`userId`, `groupId`), optional `role`
pub fn blog_schema() -> Schema {
    Schema::new(blog_tables()).expect("blog schema is valid")
}

/// The declarations behind [`blog_schema`], for tests that alter them.
pub fn blog_tables() -> Vec<TableDecl> {
    vec![
        TableDecl::new("User", "id")
            .row(RowDecl::new("id", RowType::String))
            .row(RowDecl::new("email", RowType::String).unique())
            .row(RowDecl::new("name", RowType::String))
            .row(RowDecl::new("age", RowType::Number).optional())
            .row(RowDecl::new("admin", RowType::Boolean).default(false))
            .row(RowDecl::new("karma", RowType::BigInt).optional()),
        TableDecl::new("Post", "id")
            .row(RowDecl::new("id", RowType::String))
            .row(RowDecl::new("authorId", RowType::String))
            .row(RowDecl::new("title", RowType::String))
            .row(RowDecl::new("views", RowType::Number).default(0))
            .row(RowDecl::relation(
                "author",
                RelationDecl::new("authorId", "User", "id"),
            )),
        TableDecl::new("Comment", "id")
            .row(RowDecl::new("id", RowType::String))
            .row(RowDecl::new("postId", RowType::String))
            .row(RowDecl::new("body", RowType::String))
            .row(RowDecl::relation("post", RelationDecl::new("postId", "Post", "id"))),
        TableDecl::new("Membership", vec!["userId", "groupId"])
            .row(RowDecl::new("userId", RowType::String))
            .row(RowDecl::new("groupId", RowType::String))
            .row(RowDecl::new("role", RowType::String).optional()),
    ]
}

/// A user document with id `u{n}` and email `u{n}@example.com`.
pub fn user(n: usize) -> Document {
    doc! {
        "id" => format!("u{n}"),
        "email" => format!("u{n}@example.com"),
        "name" => format!("User {n}"),
    }
}

/// A post document with id `p{n}` written by `u{author}`.
pub fn post(n: usize, author: usize) -> Document {
    doc! {
        "id" => format!("p{n}"),
        "authorId" => format!("u{author}"),
        "title" => format!("Post {n}"),
    }
}

/// An empty memory connector over [`blog_schema`].
pub fn memory_connector() -> MemoryConnector {
    MemoryConnector::new(blog_schema())
}

/// An empty in-memory SQLite connector over [`blog_schema`].
pub fn sqlite_connector() -> SqlConnector {
    SqlConnector::open_in_memory(blog_schema()).expect("Failed to open in-memory SQLite")
}

/// A SQLite connector whose store records every statement it runs.
///
/// The log starts empty: statements run while opening are cleared.
pub fn recording_connector() -> SqlConnector<RecordingStore<SqliteStore>> {
    let store = RecordingStore::new(SqliteStore::open_in_memory().expect("Failed to open SQLite"));
    let db = SqlConnector::open(blog_schema(), store).expect("Failed to open connector");
    db.store().clear();
    db
}

/// A SQLite database file in a temporary directory.
///
/// The directory lives as long as this value, so the file can be reopened
/// with a different schema.
pub struct TestSqlDatabase {
    temp_dir: TempDir,
}

impl TestSqlDatabase {
    /// Creates an empty temporary directory for the database file.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("test.db")
    }

    /// Opens the file with `schema`, migrating it.
    pub fn open(&self, schema: Schema) -> schemadb_core::CoreResult<SqlConnector> {
        self.open_with_config(schema, Config::default())
    }

    /// Opens the file with `schema` and `config`, migrating it.
    pub fn open_with_config(
        &self,
        schema: Schema,
        config: Config,
    ) -> schemadb_core::CoreResult<SqlConnector> {
        let store = SqliteStore::open(&self.path())?;
        SqlConnector::with_config(schema, store, config)
    }

    /// The temporary directory holding the file.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TestSqlDatabase {
    fn default() -> Self {
        Self::new()
    }
}
