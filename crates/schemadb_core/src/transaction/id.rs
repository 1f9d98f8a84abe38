//! Transaction identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transaction on one connector.
///
/// IDs start at 1 and increase with every `transaction` call, including
/// calls that fail. They are only meaningful within the connector that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the sequence number of this transaction.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Per-connector ID counter.
#[derive(Debug)]
pub(crate) struct TransactionIds(AtomicU64);

impl TransactionIds {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next(&self) -> TransactionId {
        TransactionId::new(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_one_and_increases() {
        let ids = TransactionIds::new();
        let first = ids.next();
        let second = ids.next();
        assert_eq!(first.get(), 1);
        assert!(first < second);
        assert_eq!(second.to_string(), "txn:2");
    }
}
