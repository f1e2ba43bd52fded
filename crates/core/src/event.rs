//! Incoming notification events.
//!
//! A [`NotificationEvent`] is what upstream producers hand to the decision
//! pipeline. It is immutable once received; the pipeline only reads it.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Category of a notification event.
///
/// Unknown type names deserialize to [`EventType::Other`] so that producers
/// can introduce new categories without being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Promotion,
    Reminder,
    Update,
    Alert,
    Message,
    SystemEvent,
    #[serde(other)]
    Other,
}

impl EventType {
    /// Every known event type, in declaration order.
    pub const ALL: [EventType; 7] = [
        EventType::Promotion,
        EventType::Reminder,
        EventType::Update,
        EventType::Alert,
        EventType::Message,
        EventType::SystemEvent,
        EventType::Other,
    ];

    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Promotion => "promotion",
            EventType::Reminder => "reminder",
            EventType::Update => "update",
            EventType::Alert => "alert",
            EventType::Message => "message",
            EventType::SystemEvent => "system_event",
            EventType::Other => "other",
        }
    }

    /// Map any type name to an event type, falling back to
    /// [`EventType::Other`] for names this build does not know.
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or(EventType::Other)
    }

    /// Alerts and system events bypass cooldown, fatigue and quiet hours.
    pub fn is_time_sensitive(self) -> bool {
        matches!(self, EventType::Alert | EventType::SystemEvent)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CoreError;

    /// Strict parse: unknown names are an error. Used where a typo must be
    /// rejected rather than silently mapped to `other` (rule patches).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown event type '{s}'. Must be one of: {}",
                    EventType::ALL.map(EventType::as_str).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// PriorityHint
// ---------------------------------------------------------------------------

/// Producer-supplied urgency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityHint {
    Low,
    Normal,
    High,
    Critical,
    Urgent,
}

impl PriorityHint {
    pub const ALL: [PriorityHint; 5] = [
        PriorityHint::Low,
        PriorityHint::Normal,
        PriorityHint::High,
        PriorityHint::Critical,
        PriorityHint::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityHint::Low => "low",
            PriorityHint::Normal => "normal",
            PriorityHint::High => "high",
            PriorityHint::Critical => "critical",
            PriorityHint::Urgent => "urgent",
        }
    }

    /// Critical and urgent hints make any event time-sensitive.
    pub fn is_time_sensitive(self) -> bool {
        matches!(self, PriorityHint::Critical | PriorityHint::Urgent)
    }
}

impl FromStr for PriorityHint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriorityHint::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid priority_hint '{s}'. Must be one of: {}",
                    PriorityHint::ALL.map(PriorityHint::as_str).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// Default delivery channel when the producer does not name one.
pub const DEFAULT_CHANNEL: &str = "push";

/// A notification candidate submitted for classification.
///
/// Constructed via [`NotificationEvent::new`] and enriched with the
/// `with_*` builder methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: String,
    pub event_type: EventType,
    pub message: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub priority_hint: Option<PriorityHint>,
    /// When the producer emitted the event. Defaults to arrival time.
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Opaque to the pipeline.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Caller-supplied idempotency key for exact duplicate detection.
    #[serde(default)]
    pub dedupe_key: Option<String>,
    /// The event is worthless at or after this instant.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl NotificationEvent {
    /// Create an event with only the required fields.
    pub fn new(
        user_id: impl Into<String>,
        event_type: EventType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            event_type,
            message: message.into(),
            source: String::new(),
            priority_hint: None,
            timestamp: Utc::now(),
            channel: DEFAULT_CHANNEL.to_string(),
            metadata: serde_json::Map::new(),
            dedupe_key: None,
            expires_at: None,
        }
    }

    pub fn with_priority(mut self, priority: PriorityHint) -> Self {
        self.priority_hint = Some(priority);
        self
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether cooldown, fatigue caps and quiet hours are bypassed.
    pub fn is_time_sensitive(&self) -> bool {
        self.event_type.is_time_sensitive()
            || self.priority_hint.is_some_and(PriorityHint::is_time_sensitive)
    }

    /// Expired when the expiry instant is at or before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
