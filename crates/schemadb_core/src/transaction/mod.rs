//! Transactions.
//!
//! A transaction body records writes on a [`TransactionHandle`]. When the
//! body returns `Ok`, the connector applies the writes as one atomic batch:
//!
//! - **Memory**: the writes are applied to a clone of the whole store state,
//!   which replaces the live state only if every write succeeds
//! - **SQL**: the writes run between `BEGIN` and `COMMIT`; any failure issues
//!   `ROLLBACK`
//!
//! Either way the registered callbacks then run, each one isolated from the
//! others: commit callbacks followed by completion callbacks on success,
//! error callbacks followed by completion callbacks on failure.

mod callbacks;
mod id;
mod state;

pub use callbacks::{CallbackError, CallbackResult};
pub use id::TransactionId;
pub(crate) use id::TransactionIds;
pub(crate) use state::PendingWrite;
pub use state::TransactionHandle;

use crate::error::CoreResult;

/// Result of a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Transaction ID.
    pub id: TransactionId,
    /// Number of recorded writes applied.
    pub operations: usize,
    /// Number of callbacks that returned an error or panicked.
    pub callback_failures: usize,
}

/// Drives one transaction: runs the body, applies its writes through
/// `apply`, then settles the callbacks.
///
/// `apply` is only called when the body succeeds. The body's own error is
/// treated like an apply failure.
pub(crate) fn run<F, A>(id: TransactionId, body: F, apply: A) -> CoreResult<TransactionOutcome>
where
    F: FnOnce(&mut TransactionHandle) -> CoreResult<()>,
    A: FnOnce(Vec<PendingWrite>) -> CoreResult<()>,
{
    let mut handle = TransactionHandle::new(id);
    let body_result = body(&mut handle);
    let (writes, callbacks) = handle.into_parts();
    let operations = writes.len();

    let result = body_result.and_then(|()| {
        tracing::debug!(txn = %id, operations, "applying transaction");
        apply(writes)
    });

    match result {
        Ok(()) => Ok(TransactionOutcome {
            id,
            operations,
            callback_failures: callbacks.settle_committed(id),
        }),
        Err(err) => {
            tracing::debug!(txn = %id, error = %err, "transaction failed");
            callbacks.settle_failed(id, &err);
            Err(err)
        }
    }
}
