//! Connector lock with a bounded wait queue.

use crate::error::{CoreError, CoreResult};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A read/write lock that refuses new waiters once `capacity` callers are
/// already blocked on it.
///
/// Uncontended acquisitions never count against the capacity.
#[derive(Debug)]
pub(crate) struct ConnectorLock<T> {
    inner: RwLock<T>,
    pending: AtomicUsize,
    capacity: usize,
}

struct Ticket<'a>(&'a AtomicUsize);

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T> ConnectorLock<T> {
    pub(crate) fn new(value: T, capacity: usize) -> Self {
        Self {
            inner: RwLock::new(value),
            pending: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Shared access for finds and counts.
    pub(crate) fn read(&self) -> CoreResult<RwLockReadGuard<'_, T>> {
        if let Some(guard) = self.inner.try_read() {
            return Ok(guard);
        }
        let _ticket = self.enqueue()?;
        Ok(self.inner.read())
    }

    /// Exclusive access for mutations.
    pub(crate) fn write(&self) -> CoreResult<RwLockWriteGuard<'_, T>> {
        if let Some(guard) = self.inner.try_write() {
            return Ok(guard);
        }
        let _ticket = self.enqueue()?;
        Ok(self.inner.write())
    }

    fn enqueue(&self) -> CoreResult<Ticket<'_>> {
        let waiting = self.pending.fetch_add(1, Ordering::SeqCst);
        let ticket = Ticket(&self.pending);
        if waiting >= self.capacity {
            tracing::warn!(capacity = self.capacity, "connector lock queue is full");
            return Err(CoreError::LockQueueFull {
                capacity: self.capacity,
            });
        }
        Ok(ticket)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
