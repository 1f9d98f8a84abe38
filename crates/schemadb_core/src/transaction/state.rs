//! Transaction handle and recorded writes.

use super::callbacks::{Callbacks, CallbackResult};
use super::TransactionId;
use crate::connector::Upsert;
use crate::error::CoreError;
use crate::query::WhereClause;
use crate::value::Document;

/// A mutation recorded by a transaction, applied at commit.
#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    /// Insert documents.
    Create {
        /// Target table.
        table: String,
        /// Documents to insert, in order.
        docs: Vec<Document>,
    },
    /// Patch matching documents.
    Update {
        /// Target table.
        table: String,
        /// Filter.
        where_clause: WhereClause,
        /// Patch.
        patch: Document,
    },
    /// Update matching documents or create one.
    Upsert {
        /// Target table.
        table: String,
        /// Upsert arguments.
        upsert: Upsert,
    },
    /// Remove matching documents.
    Delete {
        /// Target table.
        table: String,
        /// Filter.
        where_clause: WhereClause,
    },
}

impl PendingWrite {
    pub(crate) fn table(&self) -> &str {
        match self {
            Self::Create { table, .. }
            | Self::Update { table, .. }
            | Self::Upsert { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }
}

/// Records the mutations and callbacks of one transaction.
///
/// Nothing is applied while the transaction body runs; the recorded writes
/// are applied together once it returns `Ok`. Reads issued on the connector
/// during the body see the state from before the transaction.
pub struct TransactionHandle {
    id: TransactionId,
    writes: Vec<PendingWrite>,
    callbacks: Callbacks,
}

impl TransactionHandle {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            writes: Vec::new(),
            callbacks: Callbacks::default(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the number of recorded writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Records a create.
    pub fn create(&mut self, table: impl Into<String>, doc: Document) -> &mut Self {
        self.create_many(table, vec![doc])
    }

    /// Records a batch create.
    pub fn create_many(&mut self, table: impl Into<String>, docs: Vec<Document>) -> &mut Self {
        self.writes.push(PendingWrite::Create {
            table: table.into(),
            docs,
        });
        self
    }

    /// Records an update.
    pub fn update(
        &mut self,
        table: impl Into<String>,
        where_clause: WhereClause,
        patch: Document,
    ) -> &mut Self {
        self.writes.push(PendingWrite::Update {
            table: table.into(),
            where_clause,
            patch,
        });
        self
    }

    /// Records an upsert.
    pub fn upsert(&mut self, table: impl Into<String>, upsert: Upsert) -> &mut Self {
        self.writes.push(PendingWrite::Upsert {
            table: table.into(),
            upsert,
        });
        self
    }

    /// Records a delete.
    pub fn delete(&mut self, table: impl Into<String>, where_clause: WhereClause) -> &mut Self {
        self.writes.push(PendingWrite::Delete {
            table: table.into(),
            where_clause,
        });
        self
    }

    /// Runs `callback` after a successful commit.
    pub fn on_commit<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce() -> CallbackResult + 'static,
    {
        self.callbacks.on_commit.push(Box::new(callback));
        self
    }

    /// Runs `callback` with the failure if the transaction does not commit.
    pub fn on_error<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&CoreError) -> CallbackResult + 'static,
    {
        self.callbacks.on_error.push(Box::new(callback));
        self
    }

    /// Runs `callback` once the transaction has settled either way.
    pub fn on_complete<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce() -> CallbackResult + 'static,
    {
        self.callbacks.on_complete.push(Box::new(callback));
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<PendingWrite>, Callbacks) {
        (self.writes, self.callbacks)
    }
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id)
            .field("writes", &self.writes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn records_in_order() {
        let mut txn = TransactionHandle::new(TransactionId::new(7));
        txn.create("User", doc! { "id" => "a" })
            .update("User", WhereClause::eq("id", "a"), doc! { "name" => "x" })
            .delete("Post", WhereClause::all())
            .on_commit(|| Ok(()));

        assert_eq!(txn.id(), TransactionId::new(7));
        assert_eq!(txn.write_count(), 3);
        let (writes, callbacks) = txn.into_parts();
        let tables: Vec<&str> = writes.iter().map(PendingWrite::table).collect();
        assert_eq!(tables, vec!["User", "User", "Post"]);
        assert_eq!(callbacks.on_commit.len(), 1);
    }
}
