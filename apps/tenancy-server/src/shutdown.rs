use tokio::signal;

/// Resolves on Ctrl+C or SIGTERM.
///
/// A signal handler that cannot be installed is logged and then treated as
/// never firing, so the other signal still works.
pub async fn signal() {
    tokio::select! {
        () = ctrl_c() => {},
        () = sigterm() => {},
    }
    tracing::info!("shutdown signal received, initiating graceful shutdown");
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "error handling Ctrl+C signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl+C");
}

#[cfg(unix)]
async fn sigterm() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut handler) => {
            handler.recv().await;
            tracing::info!("received SIGTERM");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
