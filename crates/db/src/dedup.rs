//! Expiring key store for duplicate detection.
//!
//! Keys live in one of two namespaces ([`DedupNamespace`]) so that a
//! caller-supplied dedupe key can never collide with a content fingerprint.
//! Every entry carries its own expiry instant; expired entries are treated as
//! absent on lookup and removed by [`DedupStore::sweep`].

use async_trait::async_trait;
use chrono::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use triage_core::types::Timestamp;

use crate::error::StoreResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which kind of key a dedup entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupNamespace {
    /// Caller-supplied dedupe key.
    Exact,
    /// Content fingerprint of user, type and message prefix.
    Content,
}

/// A remembered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupEntry {
    pub first_seen: Timestamp,
    pub expires_at: Timestamp,
}

impl DedupEntry {
    fn new(now: Timestamp, window_secs: u64) -> Self {
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            first_seen: now,
            expires_at: now.checked_add_signed(window).unwrap_or(Timestamp::MAX_UTC),
        }
    }

    /// An entry blocks duplicates strictly before its expiry instant.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// DedupStore
// ---------------------------------------------------------------------------

/// Atomic check-and-record store for duplicate suppression.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Check whether `key` is present and unexpired in `namespace`.
    ///
    /// Returns the first-seen instant of the live entry if there is one.
    /// Otherwise records the key with expiry `now + window_secs` and returns
    /// `None`. The check and the insert are a single critical section per
    /// key, so of two concurrent calls with the same key exactly one sees
    /// `None`.
    async fn seen_or_record(
        &self,
        namespace: DedupNamespace,
        key: &str,
        window_secs: u64,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>>;

    /// First-seen instant of a live entry for `key`, without recording it.
    async fn peek(
        &self,
        namespace: DedupNamespace,
        key: &str,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>>;

    /// Remove a reservation made by [`seen_or_record`](Self::seen_or_record),
    /// but only if it is still the entry recorded at `first_seen`.
    ///
    /// Returns whether an entry was removed.
    async fn release(
        &self,
        namespace: DedupNamespace,
        key: &str,
        first_seen: Timestamp,
    ) -> StoreResult<bool>;

    /// Evict every entry expired at `now`. Returns the number evicted.
    async fn sweep(&self, now: Timestamp) -> StoreResult<usize>;

    /// Number of entries currently held, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// InMemoryDedupStore
// ---------------------------------------------------------------------------

/// Process-local [`DedupStore`] backed by a sharded concurrent map.
///
/// Contention is limited to keys that hash to the same shard; there is no
/// store-wide lock.
#[derive(Debug, Default)]
pub struct InMemoryDedupStore {
    entries: DashMap<(DedupNamespace, String), DedupEntry>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn seen_or_record(
        &self,
        namespace: DedupNamespace,
        key: &str,
        window_secs: u64,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        // The entry guard holds the shard lock until it is dropped.
        match self.entries.entry((namespace, key.to_string())) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live_at(now) {
                    return Ok(Some(occupied.get().first_seen));
                }
                occupied.insert(DedupEntry::new(now, window_secs));
                Ok(None)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(DedupEntry::new(now, window_secs));
                Ok(None)
            }
        }
    }

    async fn peek(
        &self,
        namespace: DedupNamespace,
        key: &str,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        Ok(self
            .entries
            .get(&(namespace, key.to_string()))
            .filter(|entry| entry.is_live_at(now))
            .map(|entry| entry.first_seen))
    }

    async fn release(
        &self,
        namespace: DedupNamespace,
        key: &str,
        first_seen: Timestamp,
    ) -> StoreResult<bool> {
        let removed = self
            .entries
            .remove_if(&(namespace, key.to_string()), |_, entry| {
                entry.first_seen == first_seen
            });
        Ok(removed.is_some())
    }

    async fn sweep(&self, now: Timestamp) -> StoreResult<usize> {
        let mut evicted = 0usize;
        self.entries.retain(|_, entry| {
            let keep = entry.is_live_at(now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        Ok(evicted)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn first_sighting_records_and_second_reports() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();

        let first = store
            .seen_or_record(DedupNamespace::Exact, "promo_1", 3600, now)
            .await
            .unwrap();
        assert_eq!(first, None);

        let later = now + Duration::seconds(42);
        let second = store
            .seen_or_record(DedupNamespace::Exact, "promo_1", 3600, later)
            .await
            .unwrap();
        assert_eq!(second, Some(now));
    }

    #[tokio::test]
    async fn expired_entry_does_not_block_and_is_replaced() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();
        store
            .seen_or_record(DedupNamespace::Content, "h", 300, now)
            .await
            .unwrap();

        let after = now + Duration::seconds(300);
        let res = store
            .seen_or_record(DedupNamespace::Content, "h", 300, after)
            .await
            .unwrap();
        assert_eq!(res, None);

        // The replacement entry now blocks with its own first-seen instant.
        let res = store
            .seen_or_record(DedupNamespace::Content, "h", 300, after + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(res, Some(after));
    }

    #[tokio::test]
    async fn namespaces_are_disjoint() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();
        store
            .seen_or_record(DedupNamespace::Exact, "same", 3600, now)
            .await
            .unwrap();
        let res = store
            .seen_or_record(DedupNamespace::Content, "same", 300, now)
            .await
            .unwrap();
        assert_eq!(res, None);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn peek_reports_live_entries_without_recording() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();

        assert_eq!(store.peek(DedupNamespace::Exact, "k", now).await.unwrap(), None);
        assert!(store.is_empty());

        store
            .seen_or_record(DedupNamespace::Exact, "k", 60, now)
            .await
            .unwrap();
        let live = store
            .peek(DedupNamespace::Exact, "k", now + Duration::seconds(30))
            .await
            .unwrap();
        let expired = store
            .peek(DedupNamespace::Exact, "k", now + Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(live, Some(now));
        assert_eq!(expired, None);
    }

    #[tokio::test]
    async fn release_only_removes_matching_reservation() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();
        store
            .seen_or_record(DedupNamespace::Exact, "k", 3600, now)
            .await
            .unwrap();

        let stale = now - Duration::seconds(5);
        assert!(!store.release(DedupNamespace::Exact, "k", stale).await.unwrap());
        assert!(store.release(DedupNamespace::Exact, "k", now).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_entries() {
        let store = InMemoryDedupStore::new();
        let now = Utc::now();
        store
            .seen_or_record(DedupNamespace::Content, "short", 300, now)
            .await
            .unwrap();
        store
            .seen_or_record(DedupNamespace::Exact, "long", 3600, now)
            .await
            .unwrap();

        let evicted = store.sweep(now + Duration::seconds(600)).await.unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_keys_admit_exactly_one() {
        let store = Arc::new(InMemoryDedupStore::new());
        let now = Utc::now();

        let tasks = (0..32).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .seen_or_record(DedupNamespace::Exact, "race", 3600, now)
                    .await
                    .unwrap()
            })
        });

        let results = futures::future::join_all(tasks).await;
        let admitted = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(Option::is_none)
            .count();
        assert_eq!(admitted, 1);
    }
}
