//! HTTP server setup.

use std::future::Future;
use std::net::SocketAddr;

use lonebox_common::error::{LoneboxError, Result};
use tokio::net::TcpListener;

use crate::api::{AppState, create_router};

/// Binds the listening socket.
///
/// # Errors
///
/// Returns an error if the address is already in use or not permitted.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| LoneboxError::Io {
        path: addr.to_string().into(),
        source: e,
    })
}

/// Serves the API on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after the shutdown signal.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr().map_err(|e| LoneboxError::Io {
        path: "listener".into(),
        source: e,
    })?;
    tracing::info!(addr = %local, "server listening on http://{local}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LoneboxError::Io {
            path: local.to_string().into(),
            source: e,
        })?;

    tracing::info!("server stopped");
    Ok(())
}
