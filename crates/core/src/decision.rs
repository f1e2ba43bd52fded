//! Decision outcomes and the records produced by the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::EventType;
use crate::types::{NotificationId, Timestamp};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Final classification of a notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Deliver immediately.
    Now,
    /// Deliver after `defer_seconds`.
    Later,
    /// Suppress.
    Never,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Now => "now",
            Decision::Later => "later",
            Decision::Never => "never",
        }
    }

    /// Whether the notification will reach the user at some point.
    pub fn is_deliverable(self) -> bool {
        matches!(self, Decision::Now | Decision::Later)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Decision {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "now" => Ok(Decision::Now),
            "later" => Ok(Decision::Later),
            "never" => Ok(Decision::Never),
            other => Err(crate::error::CoreError::Validation(format!(
                "Invalid decision '{other}'. Must be one of: now, later, never"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of the pipeline checks before it is stamped into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub decision: Decision,
    pub reason: String,
    pub defer_seconds: Option<u64>,
}

impl Outcome {
    pub fn now(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Now,
            reason: reason.into(),
            defer_seconds: None,
        }
    }

    pub fn later(defer_seconds: u64, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Later,
            reason: reason.into(),
            defer_seconds: Some(defer_seconds),
        }
    }

    pub fn never(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Never,
            reason: reason.into(),
            defer_seconds: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DecisionRecord
// ---------------------------------------------------------------------------

/// One decision, created exactly once per classified event.
///
/// This is the unit written to the audit sink and the history store.
/// `defer_seconds` is present iff `decision` is [`Decision::Later`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub notification_id: NotificationId,
    pub user_id: String,
    pub event_type: EventType,
    pub decision: Decision,
    pub reason: String,
    pub defer_seconds: Option<u64>,
    pub channel: String,
    pub decided_at: Timestamp,
    /// Informational importance score in `[0.0, 1.0]`.
    pub importance_score: f64,
    /// Produced by the degraded-mode path rather than the full check list.
    #[serde(default)]
    pub fallback: bool,
}

/// Per-decision counts for a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub now: usize,
    pub later: usize,
    pub never: usize,
}

impl DecisionSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DecisionRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                match record.decision {
                    Decision::Now => summary.now += 1,
                    Decision::Later => summary.later += 1,
                    Decision::Never => summary.never += 1,
                }
                summary
            })
    }
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// A decision as remembered in a user's fatigue timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: Timestamp,
    pub event_type: EventType,
    pub decision: Decision,
    pub notification_id: NotificationId,
}

impl From<&DecisionRecord> for HistoryEntry {
    fn from(record: &DecisionRecord) -> Self {
        Self {
            at: record.decided_at,
            event_type: record.event_type,
            decision: record.decision,
            notification_id: record.notification_id,
        }
    }
}
