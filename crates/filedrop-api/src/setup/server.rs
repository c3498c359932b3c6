//! Server startup and graceful shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use filedrop_core::Config;

use crate::state::AppState;

/// Serve until a shutdown signal arrives, then drain post-processing.
pub async fn start_server(config: &Config, state: Arc<AppState>, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let service = config.as_service();
    tracing::info!(
        max_file_size_mb = config.max_file_size_bytes() / 1024 / 1024,
        max_files_per_request = config.max_files_per_request(),
        max_concurrent_saves = config.max_concurrent_saves(),
        image_extensions = %service.image_extensions.join(","),
        document_extensions = %service.document_extensions.join(","),
        archive_extensions = %service.archive_extensions.join(","),
        media_extensions = %service.media_extensions.join(","),
        post_processing = config.post_processing_enabled(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.drain_post_processing().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the other still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
