//! Liveness endpoint.

use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use event_indexer_pipeline::shutdown::ShutdownSignal;
use tokio::net::TcpListener;
use tracing::info;

use crate::IndexingError;

/// Router exposing `GET /health`.
pub fn router() -> Router {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Bind the health endpoint's listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, IndexingError> {
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "Health endpoint listening");
    Ok(listener)
}

/// Serve the health router on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), IndexingError> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;

    Ok(())
}
