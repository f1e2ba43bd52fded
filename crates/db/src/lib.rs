//! State stores for the decision pipeline.
//!
//! Each store is a trait with a process-local implementation. Callers only
//! see atomic operations (check-and-record, append, windowed count); the
//! locking inside each implementation is never exposed.
//!
//! - [`dedup`]: expiring keys for exact and near-duplicate detection.
//! - [`history`]: per-user decision timelines for cooldowns and caps.
//! - [`audit`]: append-only record of every decision.

pub mod audit;
pub mod dedup;
pub mod error;
pub mod history;

use std::sync::Arc;

pub use audit::{AuditPage, AuditQuery, AuditSink, InMemoryAuditLog};
pub use dedup::{DedupNamespace, DedupStore, InMemoryDedupStore};
pub use error::{StoreError, StoreResult};
pub use history::{HistoryStore, InMemoryHistoryStore};

/// The set of stores shared by every classification in a deployment.
///
/// Cheaply cloneable; all members are behind `Arc`.
#[derive(Clone)]
pub struct Stores {
    pub dedup: Arc<dyn DedupStore>,
    pub history: Arc<dyn HistoryStore>,
    pub audit: Arc<dyn AuditSink>,
}

impl Stores {
    /// Process-local stores with an audit log bounded to `audit_capacity`.
    pub fn in_memory(audit_capacity: usize) -> Self {
        Self {
            dedup: Arc::new(InMemoryDedupStore::new()),
            history: Arc::new(InMemoryHistoryStore::new()),
            audit: Arc::new(InMemoryAuditLog::new(audit_capacity)),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::in_memory(audit::DEFAULT_AUDIT_CAPACITY)
    }
}
