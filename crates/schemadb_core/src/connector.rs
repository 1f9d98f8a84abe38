//! The connector interface shared by both backends.

use crate::error::CoreResult;
use crate::query::{FindOptions, WhereClause};
use crate::schema::Schema;
use crate::transaction::{CallbackResult, TransactionHandle, TransactionOutcome};
use crate::value::Document;

/// Arguments of an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    /// Documents to update.
    pub where_clause: WhereClause,
    /// Document created when nothing matches.
    pub create: Document,
    /// Patch applied to the matches.
    pub update: Document,
}

impl Upsert {
    /// Creates upsert arguments.
    #[must_use]
    pub fn new(where_clause: WhereClause, create: Document, update: Document) -> Self {
        Self {
            where_clause,
            create,
            update,
        }
    }
}

/// A schema-described document store.
///
/// [`crate::MemoryConnector`] and [`crate::SqlConnector`] implement this
/// trait with the same observable results and errors.
///
/// Writes serialize against each other and against reads. Reads run
/// concurrently. Every operation validates its arguments against the schema
/// before touching any data.
pub trait Connector: Send + Sync {
    /// Returns the schema.
    fn schema(&self) -> &Schema;

    /// Inserts a document and returns it as stored, defaults included.
    ///
    /// # Errors
    ///
    /// Validation errors, [`crate::CoreError::UniqueViolation`] or storage errors.
    fn create(&self, table: &str, doc: Document) -> CoreResult<Document>;

    /// Inserts documents atomically. An empty batch does nothing.
    ///
    /// # Errors
    ///
    /// As [`Connector::create`]; duplicates within the batch also collide.
    fn create_many(&self, table: &str, docs: Vec<Document>) -> CoreResult<Vec<Document>>;

    /// Returns the first matching document, if any.
    ///
    /// # Errors
    ///
    /// As [`Connector::find_many`].
    fn find_one(&self, table: &str, options: FindOptions) -> CoreResult<Option<Document>> {
        let limit = options.limit.map_or(1, |limit| limit.min(1));
        Ok(self
            .find_many(table, options.limit(limit))?
            .into_iter()
            .next())
    }

    /// Returns matching documents, ordered and paginated, with relations loaded.
    ///
    /// # Errors
    ///
    /// Unknown tables, rows or relations, mistyped values or storage errors.
    fn find_many(&self, table: &str, options: FindOptions) -> CoreResult<Vec<Document>>;

    /// Counts matching documents.
    ///
    /// # Errors
    ///
    /// Unknown tables or rows, mistyped values or storage errors.
    fn count(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize>;

    /// Patches matching documents and returns how many matched.
    ///
    /// An empty patch changes nothing and still returns the match count. A
    /// collision on any document rejects the whole update.
    ///
    /// # Errors
    ///
    /// Validation errors, [`crate::CoreError::UniqueViolation`] or storage errors.
    fn update(&self, table: &str, where_clause: &WhereClause, patch: &Document) -> CoreResult<usize>;

    /// Patches matching documents, or creates `create` when nothing matches.
    ///
    /// Returns 1 after a create, 0 when documents match but the patch is
    /// empty, and the number of patched documents otherwise.
    ///
    /// # Errors
    ///
    /// As [`Connector::update`] and [`Connector::create`].
    fn upsert(&self, table: &str, upsert: Upsert) -> CoreResult<usize>;

    /// Removes matching documents and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Unknown tables or rows, mistyped values or storage errors.
    fn delete(&self, table: &str, where_clause: &WhereClause) -> CoreResult<usize>;

    /// Runs `body`, then applies the writes it recorded as one atomic batch.
    ///
    /// ```rust
    /// use schemadb_core::{doc, Connector, MemoryConnector, RowDecl, RowType, Schema, TableDecl};
    ///
    /// let schema = Schema::new(vec![TableDecl::new("User", "id")
    ///     .row(RowDecl::new("id", RowType::String))]).unwrap();
    /// let db = MemoryConnector::new(schema);
    ///
    /// let outcome = db.transaction(|txn| {
    ///     txn.create("User", doc! { "id" => "a" });
    ///     txn.create("User", doc! { "id" => "b" });
    ///     txn.on_commit(|| { println!("committed"); Ok(()) });
    ///     Ok(())
    /// }).unwrap();
    /// assert_eq!(outcome.operations, 2);
    /// ```
    ///
    /// # Errors
    ///
    /// The body's error, or the first write's error. Nothing is applied in
    /// either case.
    fn transaction<F>(&self, body: F) -> CoreResult<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionHandle) -> CoreResult<()>,
        Self: Sized;

    /// Like [`Connector::transaction`], registering `on_complete` after
    /// whatever completion callbacks the body registers.
    ///
    /// # Errors
    ///
    /// As [`Connector::transaction`].
    fn transaction_with_completion<F, C>(&self, body: F, on_complete: C) -> CoreResult<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionHandle) -> CoreResult<()>,
        C: FnOnce() -> CallbackResult + 'static,
        Self: Sized,
    {
        self.transaction(|txn| {
            let result = body(txn);
            txn.on_complete(on_complete);
            result
        })
    }

    /// Closes the connector. Later operations fail with
    /// [`crate::CoreError::DatabaseClosed`].
    ///
    /// # Errors
    ///
    /// Storage errors raised while closing.
    fn close(&self) -> CoreResult<()>;

    /// Deletes every document in every table, then closes.
    ///
    /// # Errors
    ///
    /// Storage errors raised while deleting or closing.
    fn close_and_wipe(&self) -> CoreResult<()>;
}
