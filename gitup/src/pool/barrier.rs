//! Completion barrier for posted work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts outstanding tasks and wakes waiters when the count drops to zero.
///
/// Each posted task holds a [`Ticket`]; dropping it marks the task finished,
/// so a task that panics still releases its slot.
#[derive(Debug, Default)]
pub struct CompletionBarrier {
    pending: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    /// Creates a barrier with nothing outstanding.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one more outstanding task.
    pub fn register(self: &Arc<Self>) -> Ticket {
        self.pending.fetch_add(1, Ordering::AcqRel);
        Ticket {
            barrier: Arc::clone(self),
        }
    }

    /// Number of tasks registered but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until every registered ticket has been dropped.
    ///
    /// Returns immediately when nothing is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }
}

/// Proof of one outstanding task. Dropping it completes the task.
#[derive(Debug)]
pub struct Ticket {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.barrier.release();
    }
}
