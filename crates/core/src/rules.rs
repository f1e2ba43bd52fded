//! Suppression rules and partial rule patches.
//!
//! [`RuleSet`] is an immutable value; the rule engine publishes a new one for
//! every accepted [`RulePatch`]. Merging and validation live here so the
//! engine itself only has to swap snapshots.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::event::EventType;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_QUIET_START_HOUR: u8 = 22;
pub const DEFAULT_QUIET_END_HOUR: u8 = 8;
pub const DEFAULT_MAX_PER_HOUR: u32 = 10;
pub const DEFAULT_MAX_PER_DAY: u32 = 30;

const SECONDS_PER_DAY: u64 = 86_400;

/// Per-type cooldowns shipped with the service, in seconds.
pub const DEFAULT_COOLDOWNS: &[(EventType, u64)] = &[
    (EventType::Promotion, 3600),
    (EventType::Reminder, 1800),
    (EventType::Update, 600),
    (EventType::SystemEvent, 0),
    (EventType::Alert, 0),
    (EventType::Message, 0),
];

// ---------------------------------------------------------------------------
// QuietHours
// ---------------------------------------------------------------------------

/// Daily window `[start, end)` in UTC hours.
///
/// `start > end` wraps midnight (22 -> 8 covers 22:00..07:59).
/// `start == end` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: u8,
    pub end: u8,
}

impl QuietHours {
    pub fn contains_hour(&self, hour: u32) -> bool {
        let (start, end) = (u32::from(self.start), u32::from(self.end));
        if start > end {
            hour >= start || hour < end
        } else {
            start <= hour && hour < end
        }
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        self.contains_hour(at.hour())
    }

    /// Seconds from `at` until the next occurrence of `end:00`.
    pub fn seconds_until_end(&self, at: Timestamp) -> u64 {
        let now = u64::from(at.num_seconds_from_midnight());
        let end = u64::from(self.end) * 3600;
        if end > now {
            end - now
        } else {
            end + SECONDS_PER_DAY - now
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// The full suppression configuration consulted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub quiet_hours: QuietHours,
    pub max_per_hour: u32,
    pub max_per_day: u32,
    pub cooldown_seconds: BTreeMap<EventType, u64>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            quiet_hours: QuietHours {
                start: DEFAULT_QUIET_START_HOUR,
                end: DEFAULT_QUIET_END_HOUR,
            },
            max_per_hour: DEFAULT_MAX_PER_HOUR,
            max_per_day: DEFAULT_MAX_PER_DAY,
            cooldown_seconds: DEFAULT_COOLDOWNS.iter().copied().collect(),
        }
    }
}

impl RuleSet {
    /// Cooldown for `event_type`; types without an entry have none.
    pub fn cooldown_for(&self, event_type: EventType) -> u64 {
        self.cooldown_seconds.get(&event_type).copied().unwrap_or(0)
    }

    /// Produce a new rule set with the fields present in `patch` replaced.
    ///
    /// Fails without side effects if the patch is empty or any value is out
    /// of range. Cooldowns for types not named in the patch are preserved.
    pub fn apply(&self, patch: &RulePatch) -> Result<RuleSet, CoreError> {
        let errors = patch.validate();
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors.join("; ")));
        }

        let mut next = self.clone();

        if let Some(qh) = &patch.quiet_hours {
            if let Some(start) = qh.start {
                next.quiet_hours.start = start;
            }
            if let Some(end) = qh.end {
                next.quiet_hours.end = end;
            }
        }
        if let Some(max) = patch.max_per_hour {
            next.max_per_hour = max;
        }
        if let Some(max) = patch.max_per_day {
            next.max_per_day = max;
        }
        if let Some(cooldowns) = &patch.cooldown_seconds {
            for (name, secs) in cooldowns {
                // Names were checked by `validate`.
                next.cooldown_seconds.insert(name.parse()?, *secs);
            }
        }

        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// RulePatch
// ---------------------------------------------------------------------------

/// Partial quiet-hours update; either bound may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuietHoursPatch {
    pub start: Option<u8>,
    pub end: Option<u8>,
}

/// Partial rule update. Only the fields present are changed.
///
/// Unknown fields are rejected at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulePatch {
    pub quiet_hours: Option<QuietHoursPatch>,
    pub max_per_hour: Option<u32>,
    pub max_per_day: Option<u32>,
    /// Keyed by event type name; names are checked strictly.
    pub cooldown_seconds: Option<BTreeMap<String, u64>>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.quiet_hours.is_none()
            && self.max_per_hour.is_none()
            && self.max_per_day.is_none()
            && self.cooldown_seconds.is_none()
    }

    /// Returns an empty `Vec` if the patch can be applied; otherwise a list
    /// of human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.is_empty() {
            errors.push("Rule patch must change at least one field".to_string());
        }

        if let Some(qh) = &self.quiet_hours {
            if qh.start.is_none() && qh.end.is_none() {
                errors.push("quiet_hours must include start or end".to_string());
            }
            for (label, hour) in [("start", qh.start), ("end", qh.end)] {
                if let Some(h) = hour {
                    if h > 23 {
                        errors.push(format!("quiet_hours.{label} must be 0-23, got {h}"));
                    }
                }
            }
        }

        if self.max_per_hour == Some(0) {
            errors.push("max_per_hour must be at least 1".to_string());
        }
        if self.max_per_day == Some(0) {
            errors.push("max_per_day must be at least 1".to_string());
        }

        if let Some(cooldowns) = &self.cooldown_seconds {
            for name in cooldowns.keys() {
                if let Err(e) = name.parse::<EventType>() {
                    errors.push(match e {
                        CoreError::Validation(msg) => msg,
                    });
                }
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Window boundaries
// ---------------------------------------------------------------------------

/// Seconds from `at` until the next top of the hour (at least 1).
pub fn seconds_until_next_hour(at: Timestamp) -> u64 {
    let elapsed = u64::from(at.minute()) * 60 + u64::from(at.second());
    (3600 - elapsed).max(1)
}

/// Seconds from `at` until the next UTC midnight (at least 1).
pub fn seconds_until_next_day(at: Timestamp) -> u64 {
    let elapsed = u64::from(at.num_seconds_from_midnight());
    (SECONDS_PER_DAY - elapsed).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
