//! Dedupe keys are shared across users, so a classification that ends up
//! suppressed must never hold a key another user is about to use.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use triage_core::decision::Decision;
use triage_core::event::{EventType, NotificationEvent};
use triage_core::types::Timestamp;
use triage_db::{
    DedupNamespace, DedupStore, InMemoryAuditLog, InMemoryDedupStore, InMemoryHistoryStore,
    StoreResult, Stores,
};
use triage_pipeline::{DecisionEngine, EngineConfig};

// ---------------------------------------------------------------------------
// Slow content lookups
// ---------------------------------------------------------------------------

/// Delays every content-namespace check so that exact-key checks from other
/// users interleave with it.
#[derive(Default)]
struct SlowContentDedup {
    inner: InMemoryDedupStore,
}

const CONTENT_DELAY: Duration = Duration::from_millis(100);

#[async_trait]
impl DedupStore for SlowContentDedup {
    async fn seen_or_record(
        &self,
        namespace: DedupNamespace,
        key: &str,
        window_secs: u64,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        if namespace == DedupNamespace::Content {
            tokio::time::sleep(CONTENT_DELAY).await;
        }
        self.inner.seen_or_record(namespace, key, window_secs, now).await
    }

    async fn peek(
        &self,
        namespace: DedupNamespace,
        key: &str,
        now: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        self.inner.peek(namespace, key, now).await
    }

    async fn release(
        &self,
        namespace: DedupNamespace,
        key: &str,
        first_seen: Timestamp,
    ) -> StoreResult<bool> {
        self.inner.release(namespace, key, first_seen).await
    }

    async fn sweep(&self, now: Timestamp) -> StoreResult<usize> {
        self.inner.sweep(now).await
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn noon() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
}

fn engine() -> Arc<DecisionEngine> {
    let stores = Stores {
        dedup: Arc::new(SlowContentDedup::default()),
        history: Arc::new(InMemoryHistoryStore::new()),
        audit: Arc::new(InMemoryAuditLog::default()),
    };
    let config = EngineConfig {
        store_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    Arc::new(DecisionEngine::new(config, stores))
}

// ---------------------------------------------------------------------------
// Test: suppressed event does not block another user's first use of a key
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn near_duplicate_in_flight_does_not_block_other_users_key() {
    let engine = engine();
    let hello = NotificationEvent::new("alice", EventType::Message, "hello");
    engine.classify_at(&hello, noon()).await;

    let repeat = {
        let engine = Arc::clone(&engine);
        let event = hello.clone().with_dedupe_key("K");
        tokio::spawn(async move { engine.classify_at(&event, noon()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let first_use = engine
        .classify_at(
            &NotificationEvent::new("bob", EventType::Message, "other text").with_dedupe_key("K"),
            noon(),
        )
        .await;
    let repeat = repeat.await.unwrap();

    assert_eq!(repeat.decision, Decision::Never);
    assert!(repeat.reason.contains("near-identical"));
    assert_eq!(first_use.decision, Decision::Now);

    let third = engine
        .classify_at(
            &NotificationEvent::new("carol", EventType::Message, "third text").with_dedupe_key("K"),
            noon(),
        )
        .await;
    assert_eq!(third.decision, Decision::Never);
    assert!(third.reason.contains("dedupe key 'K'"));
}

// ---------------------------------------------------------------------------
// Test: two users racing for one key admit exactly one
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn users_racing_for_one_key_admit_exactly_one() {
    let engine = engine();

    let tasks = ["u1", "u2", "u3", "u4"].map(|user| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let event = NotificationEvent::new(user, EventType::Message, format!("hi from {user}"))
                .with_dedupe_key("shared");
            engine.classify_at(&event, noon()).await.decision
        })
    });

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() == Decision::Now {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}
