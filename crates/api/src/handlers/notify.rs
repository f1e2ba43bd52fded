//! Handlers for notification classification.
//!
//! Required-field validation happens here; the pipeline itself accepts any
//! well-formed [`NotificationEvent`].

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use triage_core::decision::{Decision, DecisionRecord, DecisionSummary};
use triage_core::error::CoreError;
use triage_core::event::{EventType, NotificationEvent, PriorityHint, DEFAULT_CHANNEL};
use triage_core::types::{NotificationId, Timestamp};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /notify/classify` and each element of a batch.
///
/// Every field is optional at the serde level so that missing required
/// fields are reported together by [`ClassifyRequest::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifyRequest {
    pub user_id: Option<String>,
    pub event_type: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub priority_hint: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub channel: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub dedupe_key: Option<String>,
    pub expires_at: Option<Timestamp>,
}

impl ClassifyRequest {
    /// Returns an empty `Vec` if the request is valid; otherwise a list of
    /// human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let missing: Vec<&str> = [
            ("user_id", &self.user_id),
            ("event_type", &self.event_type),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            errors.push(format!("Missing required fields: {}", missing.join(", ")));
        }

        if let Some(priority) = &self.priority_hint {
            if let Err(CoreError::Validation(msg)) = priority.parse::<PriorityHint>() {
                errors.push(msg);
            }
        }

        errors
    }

    /// Validate and convert into a pipeline event.
    ///
    /// Unknown event type names become [`EventType::Other`].
    pub fn into_event(self) -> Result<NotificationEvent, CoreError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors.join("; ")));
        }

        let event_type = EventType::from_name_lenient(self.event_type.as_deref().unwrap_or_default());
        let mut event = NotificationEvent::new(
            self.user_id.unwrap_or_default(),
            event_type,
            self.message.unwrap_or_default(),
        )
        .with_channel(self.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()))
        .with_source(self.source.unwrap_or_default())
        .with_metadata(self.metadata.unwrap_or_default());

        if let Some(priority) = self.priority_hint {
            event = event.with_priority(priority.parse()?);
        }
        if let Some(timestamp) = self.timestamp {
            event = event.with_timestamp(timestamp);
        }
        if let Some(key) = self.dedupe_key {
            event = event.with_dedupe_key(key);
        }
        if let Some(expires_at) = self.expires_at {
            event = event.with_expiry(expires_at);
        }
        Ok(event)
    }
}

/// Body of `POST /notify/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub events: Vec<ClassifyRequest>,
}

/// User-facing projection of a [`DecisionRecord`].
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub notification_id: NotificationId,
    pub user_id: String,
    pub event_type: EventType,
    pub decision: Decision,
    pub reason: String,
    pub defer_seconds: Option<u64>,
    pub importance_score: f64,
    pub processed_at: Timestamp,
}

impl From<DecisionRecord> for DecisionResponse {
    fn from(record: DecisionRecord) -> Self {
        Self {
            notification_id: record.notification_id,
            user_id: record.user_id,
            event_type: record.event_type,
            decision: record.decision,
            reason: record.reason,
            defer_seconds: record.defer_seconds,
            importance_score: record.importance_score,
            processed_at: record.decided_at,
        }
    }
}

/// Result of a batch classification.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub summary: DecisionSummary,
    pub results: Vec<DecisionResponse>,
    pub processed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /notify/classify
///
/// Classify one event as now, later or never.
pub async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> AppResult<Json<DataResponse<DecisionResponse>>> {
    let event = body.into_event()?;
    let record = state.engine.classify(&event).await;

    Ok(Json(DataResponse {
        data: record.into(),
    }))
}

/// POST /notify/batch
///
/// Classify events in order. The whole batch is rejected if any event is
/// invalid, before anything is classified.
pub async fn classify_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> AppResult<Json<DataResponse<BatchResponse>>> {
    let events = body
        .events
        .into_iter()
        .enumerate()
        .map(|(i, req)| {
            req.into_event().map_err(|err| match err {
                CoreError::Validation(msg) => CoreError::Validation(format!("events[{i}]: {msg}")),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = state.engine.classify_batch(&events).await?;

    Ok(Json(DataResponse {
        data: BatchResponse {
            total: outcome.records.len(),
            summary: outcome.summary,
            results: outcome.records.into_iter().map(Into::into).collect(),
            processed_at: Utc::now(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str, event_type: &str, message: &str) -> ClassifyRequest {
        ClassifyRequest {
            user_id: Some(user.into()),
            event_type: Some(event_type.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let errors = ClassifyRequest {
            event_type: Some("alert".into()),
            message: Some("  ".into()),
            ..Default::default()
        }
        .validate();

        assert_eq!(errors, vec!["Missing required fields: user_id, message"]);
    }

    #[test]
    fn invalid_priority_is_rejected() {
        let mut req = request("u1", "alert", "x");
        req.priority_hint = Some("asap".into());
        assert_eq!(req.validate().len(), 1);
    }

    #[test]
    fn unknown_event_type_maps_to_other() {
        let event = request("u1", "carrier_pigeon", "coo").into_event().unwrap();
        assert_eq!(event.event_type, EventType::Other);
        assert_eq!(event.channel, DEFAULT_CHANNEL);
    }

    #[test]
    fn optional_fields_are_carried_over() {
        let mut req = request("u1", "promotion", "Sale");
        req.priority_hint = Some("high".into());
        req.dedupe_key = Some("promo_1".into());
        req.channel = Some("sms".into());

        let event = req.into_event().unwrap();

        assert_eq!(event.priority_hint, Some(PriorityHint::High));
        assert_eq!(event.dedupe_key.as_deref(), Some("promo_1"));
        assert_eq!(event.channel, "sms");
    }
}
