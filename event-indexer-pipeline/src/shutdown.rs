//! Cooperative shutdown signalling.
//!
//! A [`ShutdownHandle`] fires the stop signal once; every [`ShutdownSignal`]
//! derived from it observes the signal, including ones created afterwards.

use std::sync::Arc;

use tokio::sync::watch;

/// Fires the stop signal. Cheap to clone and safe to fire more than once.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes the stop signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Create a handle whose signal has not fired.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the stop signal.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the stop signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create a receiver for the stop signal.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Whether the stop signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the stop signal fires.
    ///
    /// Returns immediately if it already fired. Dropping every handle also
    /// counts as a stop. Cancel-safe, so it can be used in `select!`.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
