//! Pending-count tracking for dispatched rows
//!
//! Every increment hands out a [`PendingGuard`]; dropping the guard is the only
//! way to decrement. A guard cannot be cloned, so each increment is matched by
//! exactly one decrement, and the decrement also runs if the owning task
//! panics.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    drained: AtomicUsize,
    zero: Notify,
}

/// Shared count of rows dispatched but not yet completed
#[derive(Debug, Clone, Default)]
pub struct PendingCount {
    inner: Arc<Inner>,
}

impl PendingCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count, returning the guard that will decrement it
    pub fn enter(&self) -> PendingGuard {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Current number of outstanding guards
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// How many times the count has fallen to zero
    pub fn times_drained(&self) -> usize {
        self.inner.drained.load(Ordering::Acquire)
    }

    /// Wait until no guards are outstanding
    pub async fn wait_for_zero(&self) {
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent drop cannot be missed.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Outstanding unit of work; decrements the count when dropped
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the row complete"]
pub struct PendingGuard {
    inner: Arc<Inner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let previous = self.inner.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "pending count decremented below zero");

        if previous == 1 {
            self.inner.drained.fetch_add(1, Ordering::AcqRel);
            self.inner.zero.notify_waiters();
        }
    }
}
