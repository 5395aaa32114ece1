//! Shutdown coordination for the listeners.

use std::sync::OnceLock;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Every listener subscribes. The signal is level-triggered, so a listener
/// that subscribes after [`Shutdown::trigger`] still observes it.
///
/// A shutdown started by [`Shutdown::fail`] keeps its cause, so the process
/// can report a failure after every listener has drained.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    fatal: OnceLock<String>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx,
            fatal: OnceLock::new(),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Trigger shutdown because of an unrecoverable error. The first cause wins.
    pub fn fail(&self, cause: impl Into<String>) {
        let _ = self.fatal.set(cause.into());
        self.trigger();
    }

    /// Cause passed to [`Shutdown::fail`], if shutdown was fatal.
    pub fn fatal_cause(&self) -> Option<&str> {
        self.fatal.get().map(String::as_str)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side held by one listener.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    ///
    /// Never resolves if the coordinator is dropped without triggering.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
