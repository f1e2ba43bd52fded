//! Domain types shared by the notification triage workspace.
//!
//! This crate has no internal dependencies so that the stores, the pipeline
//! and the API layer can all depend on it.

pub mod decision;
pub mod error;
pub mod event;
pub mod hashing;
pub mod rules;
pub mod scoring;
pub mod types;
