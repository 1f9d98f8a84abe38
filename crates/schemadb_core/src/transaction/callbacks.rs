//! Transaction callbacks and their isolation.

use super::TransactionId;
use crate::error::CoreError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Error a callback may return. It is logged and otherwise ignored.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a transaction callback.
pub type CallbackResult = Result<(), CallbackError>;

pub(crate) type SettledCallback = Box<dyn FnOnce() -> CallbackResult>;
pub(crate) type ErrorCallback = Box<dyn FnOnce(&CoreError) -> CallbackResult>;

/// Callbacks registered on one transaction, in registration order.
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) on_commit: Vec<SettledCallback>,
    pub(crate) on_error: Vec<ErrorCallback>,
    pub(crate) on_complete: Vec<SettledCallback>,
}

impl Callbacks {
    /// Runs commit callbacks, then completion callbacks.
    ///
    /// Returns how many of them failed.
    pub(crate) fn settle_committed(self, id: TransactionId) -> usize {
        let mut failures = 0;
        for callback in self.on_commit {
            failures += usize::from(!isolate(id, "commit", callback));
        }
        failures + run_complete(id, self.on_complete)
    }

    /// Runs error callbacks with `err`, then completion callbacks.
    ///
    /// Returns how many of them failed.
    pub(crate) fn settle_failed(self, id: TransactionId, err: &CoreError) -> usize {
        let mut failures = 0;
        for callback in self.on_error {
            failures += usize::from(!isolate(id, "error", || callback(err)));
        }
        failures + run_complete(id, self.on_complete)
    }
}

fn run_complete(id: TransactionId, callbacks: Vec<SettledCallback>) -> usize {
    callbacks
        .into_iter()
        .map(|callback| usize::from(!isolate(id, "complete", callback)))
        .sum()
}

// Returns false if the callback failed or panicked.
fn isolate(id: TransactionId, kind: &'static str, callback: impl FnOnce() -> CallbackResult) -> bool {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(txn = %id, kind, error = %err, "transaction callback failed");
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(txn = %id, kind, panic = %message, "transaction callback panicked");
            false
        }
    }
}
