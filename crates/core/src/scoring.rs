//! Informational importance score attached to every decision.
//!
//! The score is a weighted sum of event type, priority hint, message keyword
//! signals and channel, clamped to `[0.0, 1.0]`. It is reported alongside the
//! decision for explainability and never changes the outcome.

use crate::event::{EventType, NotificationEvent, PriorityHint};

/// Message substrings that suggest an operational problem.
pub const URGENT_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "critical",
    "urgent",
    "down",
    "breach",
    "emergency",
];

/// Message substrings that suggest marketing content.
pub const PROMO_KEYWORDS: &[&str] = &["sale", "discount", "offer", "deal", "% off", "promo"];

const KEYWORD_WEIGHT: f64 = 0.07;
const KEYWORD_CAP: f64 = 0.20;
const PROMO_PENALTY: f64 = 0.05;
const SMS_BONUS: f64 = 0.05;

fn type_weight(event_type: EventType) -> f64 {
    match event_type {
        EventType::Alert => 0.45,
        EventType::SystemEvent => 0.40,
        EventType::Message => 0.30,
        EventType::Reminder => 0.25,
        EventType::Update => 0.15,
        EventType::Promotion => 0.05,
        EventType::Other => 0.10,
    }
}

fn priority_weight(priority: Option<PriorityHint>) -> f64 {
    match priority {
        Some(PriorityHint::Critical) => 0.35,
        Some(PriorityHint::Urgent) => 0.30,
        Some(PriorityHint::High) => 0.20,
        Some(PriorityHint::Normal) => 0.05,
        Some(PriorityHint::Low) | None => 0.0,
    }
}

/// Score `event`, rounded to three decimals.
pub fn importance_score(event: &NotificationEvent) -> f64 {
    let message = event.message.to_lowercase();

    let mut score = type_weight(event.event_type) + priority_weight(event.priority_hint);

    let urgent_hits = URGENT_KEYWORDS
        .iter()
        .filter(|kw| message.contains(*kw))
        .count();
    if urgent_hits > 0 {
        score += (urgent_hits as f64 * KEYWORD_WEIGHT).min(KEYWORD_CAP);
    }
    if PROMO_KEYWORDS.iter().any(|kw| message.contains(kw)) {
        score -= PROMO_PENALTY;
    }
    if event.channel == "sms" {
        score += SMS_BONUS;
    }

    (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}
