//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for Ctrl+C / SIGINT, or SIGTERM on Unix
//! - Race them against the in-process shutdown broadcast
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed signal registration only disables that source; the broadcast
//!   still works

use tokio::sync::broadcast;

/// Resolves when a termination signal arrives or `shutdown` fires.
pub async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutdown signal received"),
        _ = terminate => tracing::info!("Terminate signal received"),
        _ = shutdown.recv() => tracing::info!("Shutdown requested"),
    }
}
