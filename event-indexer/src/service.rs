//! Runs the worker pool alongside the health endpoint.
//!
//! Either side stopping stops the other: the pool ending shuts the health
//! endpoint down, and a failing health endpoint drains the pool.

use std::net::SocketAddr;

use event_indexer_pipeline::orchestrator::Orchestrator;
use tokio::task::JoinError;
use tracing::error;

use crate::{health, IndexingError};

/// Serve `/health` on `health_addr` and run the orchestrator until both stop.
///
/// The listener is bound before any worker starts, so a taken address fails
/// right away.
pub async fn run_service(
    orchestrator: &Orchestrator,
    health_addr: SocketAddr,
) -> Result<(), IndexingError> {
    let shutdown = orchestrator.shutdown_handle();

    let listener = health::bind(health_addr).await?;
    let mut health_server = tokio::spawn(health::serve(listener, shutdown.signal()));

    let pool = orchestrator.run();
    tokio::pin!(pool);

    let (pool_result, health_result) = tokio::select! {
        result = &mut pool => {
            // The pool may also stop because the source ended.
            shutdown.shutdown();
            (result, health_outcome((&mut health_server).await))
        }
        joined = &mut health_server => {
            let health = health_outcome(joined);
            if let Err(e) = &health {
                error!(error = %e, "Health endpoint failed, shutting down");
            }
            shutdown.shutdown();
            ((&mut pool).await, health)
        }
    };

    pool_result?;
    health_result
}

fn health_outcome(
    joined: Result<Result<(), IndexingError>, JoinError>,
) -> Result<(), IndexingError> {
    joined.map_err(|e| IndexingError::health(e.to_string()))?
}
