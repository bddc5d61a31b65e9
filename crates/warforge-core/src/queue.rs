//! Bounded parts queue between the factory and the factions.
//!
//! A fixed-capacity channel decouples production from consumption within
//! each day: the producer blocks when the queue is full (true
//! backpressure) and consumers block when it is empty. The receiving half
//! is shared by all factions behind a lock, so each detail is delivered to
//! exactly one of them.

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use warforge_types::Detail;

/// Errors from the parts queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The other half of the queue was dropped mid-run.
    ///
    /// This only happens when the run is being torn down; it is fatal,
    /// like any other synchronization abort.
    #[error("parts queue closed")]
    Closed,

    /// The queue was created with zero capacity.
    #[error("queue capacity must be at least 1, got {given}")]
    InvalidCapacity {
        /// The rejected value.
        given: usize,
    },
}

/// The producing half of the parts queue, held by the factory.
#[derive(Debug, Clone)]
pub struct DetailSender {
    tx: mpsc::Sender<Detail>,
}

impl DetailSender {
    /// Push a detail, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if every receiver was dropped.
    pub async fn put(&self, detail: Detail) -> Result<(), QueueError> {
        debug!(detail = %detail, "putting detail into queue");
        self.tx.send(detail).await.map_err(|_send| QueueError::Closed)
    }
}

/// The consuming half of the parts queue, shared by all factions.
#[derive(Debug)]
pub struct DetailReceiver {
    rx: Mutex<mpsc::Receiver<Detail>>,
}

impl DetailReceiver {
    /// Pop a detail, blocking while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the sender was dropped and the
    /// queue has drained.
    pub async fn take(&self) -> Result<Detail, QueueError> {
        let detail = self.rx.lock().await.recv().await.ok_or(QueueError::Closed)?;
        debug!(detail = %detail, "took detail from queue");
        Ok(detail)
    }
}

/// Create a bounded parts queue with the given capacity.
///
/// # Errors
///
/// Returns [`QueueError::InvalidCapacity`] if `capacity` is zero.
pub fn detail_queue(capacity: usize) -> Result<(DetailSender, DetailReceiver), QueueError> {
    if capacity == 0 {
        return Err(QueueError::InvalidCapacity { given: capacity });
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((
        DetailSender { tx },
        DetailReceiver { rx: Mutex::new(rx) },
    ))
}
