//! In-process decision bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`DecisionBus`] is designed to be shared via `Arc<DecisionBus>` across
//! the application. It is not part of the audit trail: a slow subscriber
//! may miss records, while the audit sink never does.

use std::sync::Arc;

use tokio::sync::broadcast;
use triage_core::decision::DecisionRecord;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of every [`DecisionRecord`] the pipeline produces.
///
/// Records are shared behind `Arc` so fan-out does not clone message text
/// per subscriber.
pub struct DecisionBus {
    sender: broadcast::Sender<Arc<DecisionRecord>>,
}

impl DecisionBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed records are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a record to all current subscribers.
    ///
    /// If there are no active subscribers the record is silently dropped.
    pub fn publish(&self, record: Arc<DecisionRecord>) {
        // A SendError only means there are zero receivers.
        if self.sender.send(record).is_err() {
            tracing::trace!("Decision published with no subscribers");
        }
    }

    /// Subscribe to all records published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DecisionRecord>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for DecisionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
