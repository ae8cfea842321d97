//! Re-evaluation signals sent to the host

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// The host's "re-evaluate soon" primitive.
///
/// Redundant calls within one tick must be harmless.
pub trait Scheduler: Send + Sync {
    fn schedule(&self);
}

impl<F> Scheduler for F
where
    F: Fn() + Send + Sync,
{
    fn schedule(&self) {
        self()
    }
}

/// Publishes a sequence number per re-evaluation request.
pub struct BroadcastScheduler {
    tx: broadcast::Sender<u64>,
    sequence: AtomicU64,
}

impl BroadcastScheduler {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Number of signals sent so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastScheduler {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Scheduler for BroadcastScheduler {
    fn schedule(&self) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(sequence).is_err() {
            tracing::trace!("No listeners for re-evaluation {}", sequence);
        }
    }
}
