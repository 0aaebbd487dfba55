use tokio::signal;

use crate::core::state::AppState;

/// Resolves on Ctrl+C or SIGTERM, after live presence rooms have been told
/// to close so websocket sessions end before the server drains.
pub(crate) async fn shutdown_signal(state: AppState) {
    wait_for_signal().await;

    let rooms = state.presence().close_all();
    tracing::info!(rooms, "Shutdown signal received; presence rooms closed");
}

async fn wait_for_signal() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut stream) = signal::unix::signal(signal::unix::SignalKind::terminate()) else {
            tracing::error!("SIGTERM handler unavailable");
            return std::future::pending::<()>().await;
        };
        stream.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
