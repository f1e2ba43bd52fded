use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_api::background::store_sweeper;
use triage_api::config::ServerConfig;
use triage_api::router::build_app_router;
use triage_api::state::AppState;
use triage_db::Stores;
use triage_pipeline::DecisionEngine;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "triage_api=debug,triage_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store_timeout_ms = config.engine.store_timeout.as_millis() as u64,
        batch_limit = config.engine.batch_limit,
        "Loaded server configuration"
    );

    // --- Decision engine ---
    let stores = Stores::in_memory(config.audit_capacity);
    let engine = Arc::new(DecisionEngine::new(config.engine.clone(), stores));
    tracing::info!(audit_capacity = config.audit_capacity, "Decision engine ready");

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(store_sweeper::run(
        Arc::clone(&engine),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
        cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        engine: Arc::clone(&engine),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, sweeper_handle).await.is_err() {
        tracing::warn!("Store sweeper did not stop within the shutdown timeout");
    }

    let metrics = engine.metrics().snapshot();
    tracing::info!(
        total_processed = metrics.total_processed,
        fallbacks = metrics.fallbacks,
        "Graceful shutdown complete"
    );
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
