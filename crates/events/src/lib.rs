//! Decision fan-out for downstream consumers.
//!
//! The triage engine only classifies. Delivery workers, deferred-send queues
//! and analytics subscribe to the [`DecisionBus`] to act on its decisions.
//!
//! - [`DecisionBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.

pub mod bus;

pub use bus::DecisionBus;
