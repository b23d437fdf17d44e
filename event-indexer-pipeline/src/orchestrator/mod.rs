//! Orchestrator module for the event indexer pipeline.
//!
//! Runs a fixed pool of workers that take units of work from the source,
//! classify them, index successes into the sink and decide whether to
//! acknowledge.

use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Span};

use crate::consumer::{Acknowledgement, EventSource, SourceStreams, UnitOfWork};
use crate::errors::{PipelineError, SourceError};
use crate::processor::{classify, route, RoutingDecision};
use crate::shutdown::{ShutdownHandle, ShutdownSignal};
use event_indexer_repository::{EventSink, IndexError};

/// How a worker finished one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitOutcome {
    /// Indexed and acknowledged.
    Indexed,
    /// Not indexable; acknowledged without indexing.
    Dropped,
    /// Indexing failed; left unacknowledged for redelivery.
    Deferred(IndexError),
}

/// Orchestrator that runs the worker pool.
///
/// The orchestrator:
/// - Starts the source and a fixed number of workers
/// - Drains the source's error channel without stopping work
/// - Stops dispatching on shutdown and waits for in-flight units
pub struct Orchestrator {
    source: Arc<dyn EventSource>,
    sink: Arc<dyn EventSink>,
    worker_count: usize,
    shutdown: ShutdownHandle,
    started: AtomicBool,
}

impl Orchestrator {
    /// Create a new orchestrator. A worker count of zero runs one worker.
    pub fn new(source: Arc<dyn EventSource>, sink: Arc<dyn EventSink>, worker_count: usize) -> Self {
        Self {
            source,
            sink,
            worker_count: worker_count.max(1),
            shutdown: ShutdownHandle::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Number of workers `run` starts.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Handle that stops this orchestrator from any task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Run the worker pool.
    ///
    /// Returns once every worker has exited, which happens after a shutdown
    /// or once the source's unit stream ends. Units already being processed
    /// always run to completion.
    #[instrument(skip(self), fields(workers = self.worker_count))]
    pub async fn run(&self) -> Result<(), PipelineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyStarted);
        }

        info!("Starting event indexer orchestrator");

        let SourceStreams { units, errors } = self.source.consume(self.shutdown.signal());
        let drain_handle = tokio::spawn(drain_errors(errors));
        let units = Arc::new(Mutex::new(units));

        let mut workers = JoinSet::new();
        for id in 0..self.worker_count {
            let worker = Worker {
                id,
                units: units.clone(),
                sink: self.sink.clone(),
                shutdown: self.shutdown.signal(),
            };
            workers.spawn(worker.run());
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
            }
        }

        drain_handle.abort();

        if self.shutdown.is_shutdown() {
            info!("Orchestrator shutdown complete");
        } else {
            info!("Source stream ended, orchestrator stopped");
        }
        Ok(())
    }
}

/// Log and discard source errors until the channel closes.
async fn drain_errors(mut errors: mpsc::Receiver<SourceError>) {
    while let Some(e) = errors.recv().await {
        warn!(error = %e, "Event source reported an error");
    }
}

struct Worker {
    id: usize,
    units: Arc<Mutex<mpsc::Receiver<UnitOfWork>>>,
    sink: Arc<dyn EventSink>,
    shutdown: ShutdownSignal,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker = self.id, "Worker started");

        loop {
            let unit = {
                let mut units = self.units.lock().await;
                tokio::select! {
                    biased;
                    _ = self.shutdown.triggered() => {
                        debug!(worker = self.id, "Worker received shutdown signal");
                        break;
                    }
                    unit = units.recv() => match unit {
                        Some(unit) => unit,
                        None => {
                            debug!(worker = self.id, "Unit stream closed");
                            break;
                        }
                    },
                }
            };

            process_unit(self.sink.as_ref(), unit, self.id).await;
        }

        debug!(worker = self.id, "Worker stopped");
    }
}

/// Apply the routing policy to one unit of work.
#[instrument(
    skip_all,
    fields(
        worker = worker,
        event_id = %unit.event().id,
        status_code = unit.event().status_code,
        category = tracing::field::Empty,
    )
)]
pub(crate) async fn process_unit(sink: &dyn EventSink, unit: UnitOfWork, worker: usize) -> UnitOutcome {
    let (event, ack) = unit.into_parts();
    let category = classify(event.status_code);
    Span::current().record("category", category.as_str());

    match route(category) {
        RoutingDecision::DropAcknowledged => {
            debug!(
                retriable = category.is_retriable(),
                "Dropping non-indexable event"
            );
            acknowledge(ack).await;
            UnitOutcome::Dropped
        }
        RoutingDecision::Index => match sink.index(slice::from_ref(&event)).await {
            Ok(()) => {
                acknowledge(ack).await;
                debug!("Indexed event");
                UnitOutcome::Indexed
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    retriable = e.is_retriable(),
                    "Failed to index event, leaving it for redelivery"
                );
                UnitOutcome::Deferred(e)
            }
        },
    }
}

async fn acknowledge(ack: Acknowledgement) {
    if let Err(e) = ack.acknowledge().await {
        warn!(error = %e, "Failed to acknowledge event");
    }
}

#[cfg(test)]
mod tests;
