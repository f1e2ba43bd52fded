//! The decision pipeline.
//!
//! [`DecisionEngine::classify`] runs an event through an ordered list of
//! checks; the first one that matches decides:
//!
//! 1. expiry
//! 2. duplicate (exact key, then content fingerprint)
//! 3. cooldown per event type
//! 4. hourly and daily fatigue caps
//! 5. quiet hours
//!
//! Time-sensitive events skip checks 3-5. Every record is appended to the
//! user's history and the audit sink, counted and published on the bus.
//!
//! Store calls return `StoreResult`; any error or timeout short-circuits the
//! checks into a fallback outcome instead of failing the call.

use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use triage_core::decision::{DecisionRecord, DecisionSummary, HistoryEntry, Outcome};
use triage_core::error::CoreError;
use triage_core::event::{NotificationEvent, PriorityHint};
use triage_core::hashing::content_fingerprint;
use triage_core::rules::{seconds_until_next_day, seconds_until_next_hour, RuleSet};
use triage_core::scoring::importance_score;
use triage_core::types::Timestamp;
use triage_db::history::history_retention;
use triage_db::{DedupNamespace, StoreError, StoreResult, Stores};
use triage_events::DecisionBus;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::locks::UserLocks;
use crate::metrics::DecisionMetrics;
use crate::rules::RuleEngine;

pub const REASON_PASSED: &str = "passed all checks";
pub const REASON_HOURLY_CAP: &str = "hourly cap reached";
pub const REASON_DAILY_SUPPRESSED: &str = "daily cap reached — low priority suppressed";
pub const REASON_DAILY_DEFERRED: &str = "daily cap reached — deferred to next day";
pub const REASON_QUIET_HOURS: &str = "deferred to quiet-hours end";
pub const REASON_FALLBACK_SEND: &str = "[FALLBACK] engine degraded, defaulting to safe send";
pub const REASON_FALLBACK_DEFER: &str = "[FALLBACK] engine degraded, deferring";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The check that produced an outcome. Used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Expired,
    Duplicate,
    Cooldown,
    HourlyCap,
    DailyCap,
    QuietHours,
    Passed,
    Fallback,
}

impl Check {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Duplicate => "duplicate",
            Self::Cooldown => "cooldown",
            Self::HourlyCap => "hourly_cap",
            Self::DailyCap => "daily_cap",
            Self::QuietHours => "quiet_hours",
            Self::Passed => "passed",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug)]
struct Verdict {
    check: Check,
    outcome: Outcome,
}

impl Verdict {
    fn new(check: Check, outcome: Outcome) -> Self {
        Self { check, outcome }
    }
}

/// Records of a batch call, in input order, with per-decision counts.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub records: Vec<DecisionRecord>,
    pub summary: DecisionSummary,
}

/// Used and remaining quota for one fatigue window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaWindow {
    pub used: usize,
    pub limit: u32,
    pub remaining: usize,
}

impl QuotaWindow {
    fn new(used: usize, limit: u32) -> Self {
        Self {
            used,
            limit,
            remaining: (limit as usize).saturating_sub(used),
        }
    }
}

/// A user's recent decisions and what is left of their caps.
#[derive(Debug, Clone, Serialize)]
pub struct UserHistory {
    pub user_id: String,
    pub recent: Vec<HistoryEntry>,
    pub hourly: QuotaWindow,
    pub daily: QuotaWindow,
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub dedup_evicted: usize,
    pub history_pruned: usize,
    pub locks_released: usize,
}

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// Classifies notification events as `now`, `later` or `never`.
///
/// Shared across request handlers behind an `Arc`; all methods take `&self`.
pub struct DecisionEngine {
    config: EngineConfig,
    rules: RuleEngine,
    stores: Stores,
    bus: DecisionBus,
    metrics: DecisionMetrics,
    user_locks: UserLocks,
}

impl DecisionEngine {
    /// Engine with default rules and its own decision bus.
    pub fn new(config: EngineConfig, stores: Stores) -> Self {
        Self {
            config,
            rules: RuleEngine::default(),
            stores,
            bus: DecisionBus::default(),
            metrics: DecisionMetrics::new(),
            user_locks: UserLocks::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn bus(&self) -> &DecisionBus {
        &self.bus
    }

    pub fn metrics(&self) -> &DecisionMetrics {
        &self.metrics
    }

    /// Classify `event` at the current instant.
    pub async fn classify(&self, event: &NotificationEvent) -> DecisionRecord {
        self.classify_at(event, Utc::now()).await
    }

    /// Classify `event` as if it arrived at `now`.
    ///
    /// Never fails: store errors produce a fallback record.
    pub async fn classify_at(&self, event: &NotificationEvent, now: Timestamp) -> DecisionRecord {
        let (record, check) = match event.expires_at.filter(|_| event.is_expired_at(now)) {
            Some(expires_at) => {
                let reason = format!("expired at {}", expires_at.to_rfc3339());
                let record = self.stamp(event, Verdict::new(Check::Expired, Outcome::never(reason)), now);
                self.append_history(&record).await;
                (record, Check::Expired)
            }
            None => self.classify_live(event, now).await,
        };

        self.append_audit(&record).await;
        self.metrics.observe(&record, check == Check::Duplicate);
        self.bus.publish(Arc::new(record.clone()));

        tracing::info!(
            notification_id = %record.notification_id,
            user_id = %record.user_id,
            event_type = %record.event_type,
            decision = %record.decision,
            check = check.as_str(),
            defer_seconds = ?record.defer_seconds,
            "Notification classified",
        );
        record
    }

    /// Classify `events` in order. Rejects an empty batch or one over the
    /// configured limit before classifying anything.
    pub async fn classify_batch(
        &self,
        events: &[NotificationEvent],
    ) -> Result<BatchOutcome, CoreError> {
        if events.is_empty() {
            return Err(CoreError::Validation(
                "batch must contain at least one event".into(),
            ));
        }
        if events.len() > self.config.batch_limit {
            return Err(CoreError::Validation(format!(
                "batch of {} events exceeds the limit of {}",
                events.len(),
                self.config.batch_limit
            )));
        }

        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(self.classify(event).await);
        }
        let summary = DecisionSummary::from_records(&records);

        tracing::debug!(
            total = records.len(),
            now = summary.now,
            later = summary.later,
            never = summary.never,
            "Batch classified",
        );
        Ok(BatchOutcome { records, summary })
    }

    /// Recent history for `user_id` and the quota left under the current rules.
    pub async fn user_history(
        &self,
        user_id: &str,
        limit: usize,
        now: Timestamp,
    ) -> StoreResult<UserHistory> {
        let rules = self.rules.current();
        let history = &self.stores.history;

        let recent = self.bounded("history", history.recent(user_id, limit)).await?;
        let hourly = self
            .bounded("history", history.count_since(user_id, now - Duration::hours(1)))
            .await?;
        let daily = self
            .bounded("history", history.count_since(user_id, now - history_retention()))
            .await?;

        Ok(UserHistory {
            user_id: user_id.to_string(),
            recent,
            hourly: QuotaWindow::new(hourly, rules.max_per_hour),
            daily: QuotaWindow::new(daily, rules.max_per_day),
        })
    }

    /// Evict expired dedup keys, stale history and idle user locks.
    pub async fn sweep(&self, now: Timestamp) -> StoreResult<SweepReport> {
        let dedup_evicted = self.bounded("dedup", self.stores.dedup.sweep(now)).await?;
        let history_pruned = self
            .bounded("history", self.stores.history.prune(now - history_retention()))
            .await?;
        let locks_released = self.user_locks.release_idle();

        Ok(SweepReport {
            dedup_evicted,
            history_pruned,
            locks_released,
        })
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Checks and history append for an unexpired event, under the user lock.
    async fn classify_live(&self, event: &NotificationEvent, now: Timestamp) -> (DecisionRecord, Check) {
        let guard = self.lock_user(&event.user_id).await;
        let evaluated = match &guard {
            Ok(_) => self.evaluate(event, now).await,
            Err(error) => Err(error.clone()),
        };

        let verdict = evaluated.unwrap_or_else(|error| {
            tracing::warn!(
                user_id = %event.user_id,
                event_type = %event.event_type,
                error = %error,
                "Store failure during classification, using fallback",
            );
            self.fallback(event)
        });

        let check = verdict.check;
        let record = self.stamp(event, verdict, now);
        self.append_history(&record).await;
        drop(guard);
        (record, check)
    }

    async fn evaluate(&self, event: &NotificationEvent, now: Timestamp) -> StoreResult<Verdict> {
        let time_sensitive = event.is_time_sensitive();
        let rules = self.rules.current();

        if let Some(verdict) = self.check_duplicate(event, now).await? {
            return Ok(verdict);
        }
        if !time_sensitive {
            if let Some(verdict) = self.check_cooldown(event, &rules, now).await? {
                return Ok(verdict);
            }
            if let Some(verdict) = self.check_fatigue(event, &rules, now).await? {
                return Ok(verdict);
            }
            if let Some(verdict) = check_quiet_hours(&rules, now) {
                return Ok(verdict);
            }
        }
        Ok(Verdict::new(Check::Passed, Outcome::now(REASON_PASSED)))
    }

    /// Exact key first, then content fingerprint.
    ///
    /// The exact key is shared across users, so it is only peeked until the
    /// content check passes and is claimed last. The content fingerprint is
    /// per user and therefore guarded by the user lock, which makes it safe
    /// to release if the claim loses a race.
    async fn check_duplicate(
        &self,
        event: &NotificationEvent,
        now: Timestamp,
    ) -> StoreResult<Option<Verdict>> {
        let dedup = &self.stores.dedup;
        let exact_key = event.dedupe_key.as_deref().filter(|key| !key.is_empty());

        if let Some(key) = exact_key {
            let seen = self
                .bounded("dedup", dedup.peek(DedupNamespace::Exact, key, now))
                .await?;
            if let Some(first_seen) = seen {
                return Ok(Some(exact_duplicate(key, first_seen, now)));
            }
        }

        let fingerprint = content_fingerprint(event);
        let seen = self
            .bounded(
                "dedup",
                dedup.seen_or_record(
                    DedupNamespace::Content,
                    &fingerprint,
                    self.config.near_window_secs,
                    now,
                ),
            )
            .await?;
        if let Some(first_seen) = seen {
            let reason = format!(
                "duplicate: near-identical content first seen {}s ago",
                elapsed_secs(first_seen, now)
            );
            return Ok(Some(Verdict::new(Check::Duplicate, Outcome::never(reason))));
        }

        let Some(key) = exact_key else {
            return Ok(None);
        };
        let claimed = self
            .bounded(
                "dedup",
                dedup.seen_or_record(DedupNamespace::Exact, key, self.config.exact_window_secs, now),
            )
            .await;
        match claimed {
            Ok(None) => Ok(None),
            Ok(Some(first_seen)) => {
                self.release_reservation(DedupNamespace::Content, &fingerprint, now)
                    .await;
                Ok(Some(exact_duplicate(key, first_seen, now)))
            }
            Err(error) => {
                self.release_reservation(DedupNamespace::Content, &fingerprint, now)
                    .await;
                Err(error)
            }
        }
    }

    async fn check_cooldown(
        &self,
        event: &NotificationEvent,
        rules: &RuleSet,
        now: Timestamp,
    ) -> StoreResult<Option<Verdict>> {
        let cooldown = rules.cooldown_for(event.event_type);
        if cooldown == 0 {
            return Ok(None);
        }

        let last_sent = self
            .bounded(
                "history",
                self.stores.history.most_recent(&event.user_id, event.event_type),
            )
            .await?;
        let Some(last_sent) = last_sent else {
            return Ok(None);
        };

        let elapsed = elapsed_secs(last_sent, now);
        if elapsed >= cooldown {
            return Ok(None);
        }
        let remaining = cooldown - elapsed;
        let reason = format!(
            "cooldown active for {}: {remaining}s remaining",
            event.event_type
        );
        Ok(Some(Verdict::new(
            Check::Cooldown,
            Outcome::later(remaining, reason),
        )))
    }

    async fn check_fatigue(
        &self,
        event: &NotificationEvent,
        rules: &RuleSet,
        now: Timestamp,
    ) -> StoreResult<Option<Verdict>> {
        let history = &self.stores.history;

        let hourly = self
            .bounded("history", history.count_since(&event.user_id, now - Duration::hours(1)))
            .await?;
        if hourly >= rules.max_per_hour as usize {
            let reason = format!("{REASON_HOURLY_CAP} ({hourly}/{})", rules.max_per_hour);
            return Ok(Some(Verdict::new(
                Check::HourlyCap,
                Outcome::later(seconds_until_next_hour(now), reason),
            )));
        }

        let daily = self
            .bounded("history", history.count_since(&event.user_id, now - history_retention()))
            .await?;
        if daily >= rules.max_per_day as usize {
            let outcome = if event.priority_hint == Some(PriorityHint::High) {
                Outcome::later(seconds_until_next_day(now), REASON_DAILY_DEFERRED)
            } else {
                Outcome::never(REASON_DAILY_SUPPRESSED)
            };
            return Ok(Some(Verdict::new(Check::DailyCap, outcome)));
        }

        Ok(None)
    }

    fn fallback(&self, event: &NotificationEvent) -> Verdict {
        let outcome = if event.is_time_sensitive() {
            Outcome::now(REASON_FALLBACK_SEND)
        } else {
            Outcome::later(self.config.fallback_defer_secs, REASON_FALLBACK_DEFER)
        };
        Verdict::new(Check::Fallback, outcome)
    }

    fn stamp(&self, event: &NotificationEvent, verdict: Verdict, now: Timestamp) -> DecisionRecord {
        DecisionRecord {
            notification_id: Uuid::new_v4(),
            user_id: event.user_id.clone(),
            event_type: event.event_type,
            decision: verdict.outcome.decision,
            reason: verdict.outcome.reason,
            defer_seconds: verdict.outcome.defer_seconds,
            channel: event.channel.clone(),
            decided_at: now,
            importance_score: importance_score(event),
            fallback: verdict.check == Check::Fallback,
        }
    }

    // -----------------------------------------------------------------------
    // Store plumbing
    // -----------------------------------------------------------------------

    async fn append_history(&self, record: &DecisionRecord) {
        let appended = self
            .bounded(
                "history",
                self.stores
                    .history
                    .append(&record.user_id, HistoryEntry::from(record)),
            )
            .await;
        if let Err(error) = appended {
            tracing::warn!(
                notification_id = %record.notification_id,
                error = %error,
                "Failed to append decision to history",
            );
        }
    }

    async fn append_audit(&self, record: &DecisionRecord) {
        let appended = self
            .bounded("audit", self.stores.audit.append(record.clone()))
            .await;
        if let Err(error) = appended {
            tracing::error!(
                notification_id = %record.notification_id,
                error = %error,
                "Failed to append decision to audit log",
            );
        }
    }

    async fn release_reservation(&self, namespace: DedupNamespace, key: &str, reserved_at: Timestamp) {
        let released = self
            .bounded("dedup", self.stores.dedup.release(namespace, key, reserved_at))
            .await;
        if let Err(error) = released {
            tracing::warn!(?namespace, key, error = %error, "Failed to release dedup reservation");
        }
    }

    async fn lock_user(&self, user_id: &str) -> StoreResult<OwnedMutexGuard<()>> {
        tokio::time::timeout(self.config.store_timeout, self.user_locks.acquire(user_id))
            .await
            .map_err(|_| self.timeout_error("user lock"))
    }

    /// Run a store call under the configured deadline.
    async fn bounded<T, F>(&self, store: &'static str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error(store)),
        }
    }

    fn timeout_error(&self, store: &'static str) -> StoreError {
        StoreError::Timeout {
            store,
            timeout_ms: self.config.store_timeout.as_millis() as u64,
        }
    }
}

fn check_quiet_hours(rules: &RuleSet, now: Timestamp) -> Option<Verdict> {
    rules.quiet_hours.contains(now).then(|| {
        Verdict::new(
            Check::QuietHours,
            Outcome::later(rules.quiet_hours.seconds_until_end(now), REASON_QUIET_HOURS),
        )
    })
}

fn exact_duplicate(key: &str, first_seen: Timestamp, now: Timestamp) -> Verdict {
    let reason = format!(
        "duplicate: dedupe key '{key}' first seen {}s ago",
        elapsed_secs(first_seen, now)
    );
    Verdict::new(Check::Duplicate, Outcome::never(reason))
}

/// Whole seconds from `since` to `now`, zero if `since` is in the future.
fn elapsed_secs(since: Timestamp, now: Timestamp) -> u64 {
    u64::try_from((now - since).num_seconds()).unwrap_or(0)
}
