//! Interrupt handling.
//!
//! Ctrl+C (and SIGTERM on Unix) stops the server: the listener is closed and
//! `BoundServer::run` returns.

use std::future::Future;

use axum_server::Handle;

/// Shut the server down on SIGINT or SIGTERM.
pub fn setup_shutdown_handler(handle: Handle) {
    tokio::spawn(shutdown_on(handle, interrupt()));
}

/// Wait for `signal`, then close the listener and every open connection.
pub async fn shutdown_on(handle: Handle, signal: impl Future<Output = ()>) {
    signal.await;
    handle.shutdown();
}

/// Resolves on the first Ctrl+C or SIGTERM.
async fn interrupt() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            tracing::info!("Received Ctrl+C, stopping server");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, stopping server");
        }
    }
}
