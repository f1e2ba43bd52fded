//! Notification triage: decides whether each event is delivered now,
//! deferred, or suppressed.
//!
//! [`DecisionEngine`] owns the check order and fallback handling;
//! [`RuleEngine`] holds the hot-swappable suppression rules.

pub mod config;
pub mod engine;
pub mod locks;
pub mod metrics;
pub mod rules;

pub use config::EngineConfig;
pub use engine::{BatchOutcome, Check, DecisionEngine, QuotaWindow, SweepReport, UserHistory};
pub use metrics::{DecisionMetrics, MetricsSnapshot};
pub use rules::RuleEngine;
