//! Process-wide decision counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use triage_core::decision::{Decision, DecisionRecord};

/// Lock-free counters updated once per classified event.
#[derive(Debug, Default)]
pub struct DecisionMetrics {
    total: AtomicU64,
    now: AtomicU64,
    later: AtomicU64,
    never: AtomicU64,
    duplicates: AtomicU64,
    fallbacks: AtomicU64,
}

/// Per-decision counts within a [`MetricsSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    pub now: u64,
    pub later: u64,
    pub never: u64,
}

/// Share of each decision in percent, one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionRates {
    pub send_rate: f64,
    pub defer_rate: f64,
    pub suppress_rate: f64,
}

/// Point-in-time copy of [`DecisionMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_processed: u64,
    pub decisions: DecisionCounts,
    pub rates: DecisionRates,
    pub duplicates_suppressed: u64,
    pub fallbacks: u64,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `record`. `duplicate` marks a duplicate-check suppression.
    pub fn observe(&self, record: &DecisionRecord, duplicate: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let bucket = match record.decision {
            Decision::Now => &self.now,
            Decision::Later => &self.later,
            Decision::Never => &self.never,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        if record.fallback {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let decisions = DecisionCounts {
            now: self.now.load(Ordering::Relaxed),
            later: self.later.load(Ordering::Relaxed),
            never: self.never.load(Ordering::Relaxed),
        };

        MetricsSnapshot {
            total_processed: total,
            rates: DecisionRates {
                send_rate: percent(decisions.now, total),
                defer_rate: percent(decisions.later, total),
                suppress_rate: percent(decisions.never, total),
            },
            decisions,
            duplicates_suppressed: self.duplicates.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}
