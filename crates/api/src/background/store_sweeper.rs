//! Periodic eviction of expired dedup keys and stale history.
//!
//! Lookups already ignore expired state; the sweep only bounds memory.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use triage_pipeline::DecisionEngine;

/// Run the sweep loop every `interval` until `cancel` is triggered.
pub async fn run(engine: Arc<DecisionEngine>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Store sweeper started");

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; nothing has expired yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Store sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                match engine.sweep(Utc::now()).await {
                    Ok(report) => {
                        if report.dedup_evicted + report.history_pruned + report.locks_released > 0 {
                            tracing::info!(
                                dedup_evicted = report.dedup_evicted,
                                history_pruned = report.history_pruned,
                                locks_released = report.locks_released,
                                "Store sweep: evicted expired state"
                            );
                        } else {
                            tracing::debug!("Store sweep: nothing to evict");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Store sweep failed");
                    }
                }
            }
        }
    }
}
