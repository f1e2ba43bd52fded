//! Per-user decision timelines used for cooldowns and fatigue caps.
//!
//! Each user owns an ordered `Vec<HistoryEntry>`. Appends for one user are
//! serialized by the map shard holding that user's timeline; different users
//! never wait on each other. Windows are applied at query time and old
//! entries are pruned lazily.

use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use triage_core::decision::{Decision, HistoryEntry};
use triage_core::event::EventType;
use triage_core::types::Timestamp;

use crate::error::StoreResult;

/// Longest window any query needs, in seconds; older entries may be dropped.
pub const HISTORY_RETENTION_SECS: i64 = 86_400;

/// [`HISTORY_RETENTION_SECS`] as a duration.
pub fn history_retention() -> Duration {
    Duration::seconds(HISTORY_RETENTION_SECS)
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Append-only per-user decision timeline.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append `entry` to the user's timeline, keeping it ordered by instant.
    async fn append(&self, user_id: &str, entry: HistoryEntry) -> StoreResult<()>;

    /// Number of deliverable entries (now or later) strictly after `since`.
    async fn count_since(&self, user_id: &str, since: Timestamp) -> StoreResult<usize>;

    /// Instant of the most recent delivered (`now`) entry of `event_type`.
    async fn most_recent(
        &self,
        user_id: &str,
        event_type: EventType,
    ) -> StoreResult<Option<Timestamp>>;

    /// Up to `limit` entries, newest first.
    async fn recent(&self, user_id: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    /// Drop entries at or before `before`. Returns the number dropped.
    async fn prune(&self, before: Timestamp) -> StoreResult<usize>;

    /// Number of users with a timeline.
    fn user_count(&self) -> usize;
}

// ---------------------------------------------------------------------------
// InMemoryHistoryStore
// ---------------------------------------------------------------------------

/// Process-local [`HistoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    timelines: DashMap<String, Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user_id: &str, entry: HistoryEntry) -> StoreResult<()> {
        let mut timeline = self.timelines.entry(user_id.to_string()).or_default();

        // Entries normally arrive in order; a late instant is slotted in
        // after any entry with the same instant.
        let pos = timeline.partition_point(|e| e.at <= entry.at);
        let cutoff = entry.at - history_retention();
        timeline.insert(pos, entry);

        let stale = timeline.partition_point(|e| e.at <= cutoff);
        if stale > 0 {
            timeline.drain(..stale);
        }
        Ok(())
    }

    async fn count_since(&self, user_id: &str, since: Timestamp) -> StoreResult<usize> {
        let Some(timeline) = self.timelines.get(user_id) else {
            return Ok(0);
        };
        let start = timeline.partition_point(|e| e.at <= since);
        Ok(timeline[start..]
            .iter()
            .filter(|e| e.decision.is_deliverable())
            .count())
    }

    async fn most_recent(
        &self,
        user_id: &str,
        event_type: EventType,
    ) -> StoreResult<Option<Timestamp>> {
        let Some(timeline) = self.timelines.get(user_id) else {
            return Ok(None);
        };
        Ok(timeline
            .iter()
            .rev()
            .find(|e| e.event_type == event_type && e.decision == Decision::Now)
            .map(|e| e.at))
    }

    async fn recent(&self, user_id: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self
            .timelines
            .get(user_id)
            .map(|timeline| timeline.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn prune(&self, before: Timestamp) -> StoreResult<usize> {
        let mut dropped = 0usize;
        self.timelines.retain(|_, timeline| {
            let stale = timeline.partition_point(|e| e.at <= before);
            if stale > 0 {
                timeline.drain(..stale);
                dropped += stale;
            }
            !timeline.is_empty()
        });
        Ok(dropped)
    }

    fn user_count(&self) -> usize {
        self.timelines.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
