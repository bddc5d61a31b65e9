//! Per-day rendezvous primitives.
//!
//! Each simulated day uses two countdown latches: `ready_for_night` and
//! `ready_for_new_day`, both initialized to the party count. Every party
//! decrements each latch exactly once per day; a latch reaching zero wakes
//! the coordinator. Once a day completes, the pair is replaced wholesale
//! with a fresh [`DayRendezvous`] -- a stale latch from a prior day can
//! never be signaled again because parties always fetch the current pair
//! through the coordinator.
//!
//! The latch is an [`AtomicUsize`] plus a [`Notify`]. The waiter creates
//! its `notified()` future *before* re-checking the counter, which closes
//! the lost-wakeup window between a final decrement and the wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Errors from countdown latch operations.
#[derive(Debug, thiserror::Error)]
pub enum LatchError {
    /// A latch that already reached zero was signaled again.
    ///
    /// The rendezvous counters never go negative; an extra signal means a
    /// party is out of step with the day cycle.
    #[error("countdown latch signaled below zero")]
    Underflow,
}

/// A one-shot countdown: `count_down` to zero wakes all waiters.
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: AtomicUsize,
    zero: Notify,
}

impl CountdownLatch {
    /// Create a latch requiring `count` signals before it opens.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            zero: Notify::new(),
        }
    }

    /// Number of signals still outstanding.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Decrement the counter, waking waiters when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns [`LatchError::Underflow`] if the latch is already at zero.
    pub fn count_down(&self) -> Result<(), LatchError> {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_zero| LatchError::Underflow)?;
        if previous == 1 {
            self.zero.notify_waiters();
        }
        Ok(())
    }

    /// Wait until the counter reaches zero.
    ///
    /// Returns immediately if the latch is already open. The counter is
    /// re-checked after every wake, so a spurious notification cannot
    /// release the waiter early.
    pub async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            if self.remaining.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// The pair of countdown latches for a single simulated day.
///
/// Replaced as a unit by the coordinator during new-day preparations.
#[derive(Debug, Clone)]
pub struct DayRendezvous {
    ready_for_night: Arc<CountdownLatch>,
    ready_for_new_day: Arc<CountdownLatch>,
}

impl DayRendezvous {
    /// Allocate fresh latches for a new day, both set to `party_count`.
    pub fn fresh(party_count: usize) -> Self {
        Self {
            ready_for_night: Arc::new(CountdownLatch::new(party_count)),
            ready_for_new_day: Arc::new(CountdownLatch::new(party_count)),
        }
    }

    /// The latch parties decrement when their day work is done.
    pub fn ready_for_night(&self) -> Arc<CountdownLatch> {
        Arc::clone(&self.ready_for_night)
    }

    /// The latch parties decrement when their night work is done.
    pub fn ready_for_new_day(&self) -> Arc<CountdownLatch> {
        Arc::clone(&self.ready_for_new_day)
    }
}
