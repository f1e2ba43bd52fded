//! Append-only audit log of every decision.
//!
//! The pipeline's only obligation is to append each record exactly once;
//! queries return matches newest first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use triage_core::decision::{Decision, DecisionRecord};

use crate::error::{StoreError, StoreResult};

/// Default number of records returned by a query.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Upper bound on records returned by a single query.
pub const MAX_QUERY_LIMIT: usize = 200;

/// Default number of records retained in memory.
pub const DEFAULT_AUDIT_CAPACITY: usize = 100_000;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Filters for [`AuditSink::query`]. Absent filters match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub decision: Option<Decision>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Effective limit, defaulted and clamped to `1..=MAX_QUERY_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT)
    }

    fn matches(&self, record: &DecisionRecord) -> bool {
        self.user_id
            .as_deref()
            .map_or(true, |user_id| record.user_id == user_id)
            && self.decision.map_or(true, |d| record.decision == d)
    }
}

/// One page of audit results.
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    /// Total matching records retained, before the limit is applied.
    pub total: usize,
    /// Matching records, newest first.
    pub items: Vec<DecisionRecord>,
}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Write/read contract for the decision audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: DecisionRecord) -> StoreResult<()>;

    async fn query(&self, query: &AuditQuery) -> StoreResult<AuditPage>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// InMemoryAuditLog
// ---------------------------------------------------------------------------

/// Inbox backlog at which an append tries to fold records into the log.
const DRAIN_THRESHOLD: usize = 256;

/// Bounded in-memory [`AuditSink`]. When full, the oldest record is dropped.
///
/// Appends push onto an unbounded channel and never wait on a lock. The
/// retained log has a single writer: whoever holds its mutex drains the
/// inbox into it, which queries always do and appends do opportunistically
/// once the backlog reaches [`DRAIN_THRESHOLD`]. Channel order is append
/// order, so the log stays oldest-first.
#[derive(Debug)]
pub struct InMemoryAuditLog {
    inbox: mpsc::UnboundedSender<DecisionRecord>,
    retained: Mutex<RetainedLog>,
    pending: AtomicUsize,
    capacity: usize,
}

#[derive(Debug)]
struct RetainedLog {
    inbox: mpsc::UnboundedReceiver<DecisionRecord>,
    records: VecDeque<DecisionRecord>,
}

impl InMemoryAuditLog {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            inbox: sender,
            retained: Mutex::new(RetainedLog {
                inbox: receiver,
                records: VecDeque::new(),
            }),
            pending: AtomicUsize::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Move every queued record into the retained log.
    fn drain(&self, log: &mut RetainedLog) {
        let mut dropped = 0usize;
        while let Ok(record) = log.inbox.try_recv() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            if log.records.len() >= self.capacity {
                log.records.pop_front();
                dropped += 1;
            }
            log.records.push_back(record);
        }
        if dropped > 0 {
            tracing::debug!(capacity = self.capacity, dropped, "Audit log full, dropped oldest records");
        }
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn append(&self, record: DecisionRecord) -> StoreResult<()> {
        // Counted before sending so a concurrent drain never underflows.
        let pending = self.pending.fetch_add(1, Ordering::Relaxed) + 1;
        if self.inbox.send(record).is_err() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(StoreError::Unavailable {
                store: "audit",
                reason: "audit inbox closed".into(),
            });
        }

        if pending >= DRAIN_THRESHOLD {
            if let Some(mut log) = self.retained.try_lock() {
                self.drain(&mut log);
            }
        }
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> StoreResult<AuditPage> {
        let mut log = self.retained.lock();
        self.drain(&mut log);
        let limit = query.effective_limit();

        let mut total = 0usize;
        let mut items = Vec::with_capacity(limit.min(log.records.len()));
        for record in log.records.iter().rev().filter(|r| query.matches(r)) {
            total += 1;
            if items.len() < limit {
                items.push(record.clone());
            }
        }

        Ok(AuditPage { total, items })
    }

    fn len(&self) -> usize {
        let mut log = self.retained.lock();
        self.drain(&mut log);
        log.records.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use triage_core::event::EventType;

    fn record(user_id: &str, decision: Decision) -> DecisionRecord {
        DecisionRecord {
            notification_id: uuid::Uuid::new_v4(),
            user_id: user_id.to_string(),
            event_type: EventType::Message,
            decision,
            reason: "test".into(),
            defer_seconds: None,
            channel: "push".into(),
            decided_at: Utc::now(),
            importance_score: 0.3,
            fallback: false,
        }
    }

    #[tokio::test]
    async fn query_returns_newest_first_with_filters() {
        let log = InMemoryAuditLog::default();
        let first = record("u1", Decision::Now);
        let second = record("u2", Decision::Never);
        let third = record("u1", Decision::Never);
        for r in [&first, &second, &third] {
            log.append(r.clone()).await.unwrap();
        }

        let all = log.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].notification_id, third.notification_id);
        assert_eq!(all.items[2].notification_id, first.notification_id);

        let u1_never = log
            .query(&AuditQuery {
                user_id: Some("u1".into()),
                decision: Some(Decision::Never),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(u1_never.total, 1);
        assert_eq!(u1_never.items[0].notification_id, third.notification_id);
    }

    #[tokio::test]
    async fn limit_truncates_items_but_not_total() {
        let log = InMemoryAuditLog::default();
        for _ in 0..5 {
            log.append(record("u1", Decision::Now)).await.unwrap();
        }
        let page = log
            .query(&AuditQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn limit_is_clamped() {
        let q = |limit| AuditQuery { limit, ..Default::default() };
        assert_eq!(q(None).effective_limit(), DEFAULT_QUERY_LIMIT);
        assert_eq!(q(Some(0)).effective_limit(), 1);
        assert_eq!(q(Some(10_000)).effective_limit(), MAX_QUERY_LIMIT);
    }

    #[tokio::test]
    async fn capacity_drops_oldest_record() {
        let log = InMemoryAuditLog::new(2);
        let oldest = record("u1", Decision::Now);
        log.append(oldest.clone()).await.unwrap();
        log.append(record("u1", Decision::Now)).await.unwrap();
        log.append(record("u1", Decision::Now)).await.unwrap();

        assert_eq!(log.len(), 2);
        let page = log.query(&AuditQuery::default()).await.unwrap();
        assert!(page
            .items
            .iter()
            .all(|r| r.notification_id != oldest.notification_id));
    }

    #[tokio::test]
    async fn backlog_is_folded_in_without_a_query() {
        let log = InMemoryAuditLog::new(10);
        for _ in 0..DRAIN_THRESHOLD {
            log.append(record("u1", Decision::Now)).await.unwrap();
        }

        assert_eq!(log.pending.load(Ordering::Relaxed), 0);
        assert_eq!(log.retained.lock().records.len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_all_retained() {
        let log = std::sync::Arc::new(InMemoryAuditLog::default());

        let tasks = (0..8).map(|i| {
            let log = std::sync::Arc::clone(&log);
            tokio::spawn(async move {
                for _ in 0..100 {
                    log.append(record(&format!("u{i}"), Decision::Now)).await.unwrap();
                }
            })
        });
        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(log.len(), 800);
        let u3 = log
            .query(&AuditQuery {
                user_id: Some("u3".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(u3.total, 100);
    }
}
