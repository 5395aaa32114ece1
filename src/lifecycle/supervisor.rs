//! Listener supervisor.
//!
//! # Responsibilities
//! - Start one serving task per bind address
//! - Wait for every task before returning
//! - Report each listener's failure without touching its siblings
//!
//! # Design Decisions
//! - Each task gets its own owned address and an `Arc` clone of the server
//! - No restarts: a failed address stays down for the process lifetime
//! - A panicking listener is reported like any other failure

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::BindAddresses;
use crate::net::error::ServeError;

/// Serves one bind address until it fails or shuts down.
pub trait Serve: Send + Sync + 'static {
    fn serve(self: Arc<Self>, addr: String) -> BoxFuture<'static, Result<(), ServeError>>;
}

/// Why a listener ended badly.
#[derive(Debug, Error)]
pub enum ListenerFailure {
    #[error(transparent)]
    Serve(ServeError),

    #[error("listener task panicked: {0}")]
    Panicked(String),
}

/// Final state of one listener.
#[derive(Debug)]
pub struct ListenerOutcome {
    /// Position of the address in the bind list.
    pub index: usize,
    pub address: String,
    pub result: Result<(), ListenerFailure>,
}

/// Outcomes of every listener, in bind-list order.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    pub outcomes: Vec<ListenerOutcome>,
}

impl SupervisorReport {
    pub fn failures(&self) -> impl Iterator<Item = &ListenerOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.failed_count() == self.outcomes.len()
    }
}

/// Run one listener per address and block until all of them have ended.
pub async fn run<S: Serve>(addresses: &BindAddresses, server: Arc<S>) -> SupervisorReport {
    let mut tasks = JoinSet::new();
    let mut addresses_by_task = HashMap::new();

    for (index, address) in addresses.iter().enumerate() {
        tracing::info!(address = %address, "Start listening");

        let task_address = address.to_string();
        let server = Arc::clone(&server);
        let handle = tasks.spawn(async move { server.serve(task_address).await });
        addresses_by_task.insert(handle.id(), (index, address.to_string()));
    }

    let mut outcomes = Vec::with_capacity(addresses.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, result) = match joined {
            Ok((task_id, Ok(()))) => (task_id, Ok(())),
            Ok((task_id, Err(e))) => (task_id, Err(ListenerFailure::Serve(e))),
            Err(join_error) => {
                let task_id = join_error.id();
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                (task_id, Err(ListenerFailure::Panicked(message)))
            }
        };

        let Some((index, address)) = addresses_by_task.remove(&task_id) else {
            continue;
        };
        match &result {
            Ok(()) => tracing::info!(address = %address, "Listener stopped"),
            Err(e) => tracing::error!(address = %address, error = %e, "Listener failed"),
        }
        outcomes.push(ListenerOutcome {
            index,
            address,
            result,
        });
    }

    outcomes.sort_by_key(|o| o.index);
    SupervisorReport { outcomes }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Fake transport: `fail:*` errors at once, `panic:*` panics, anything
    /// else serves for a while and then stops cleanly.
    #[derive(Default)]
    struct FakeServer {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl Serve for FakeServer {
        fn serve(self: Arc<Self>, addr: String) -> BoxFuture<'static, Result<(), ServeError>> {
            Box::pin(async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                if addr.starts_with("fail:") {
                    return Err(ServeError::NoAddress(addr));
                }
                if addr.starts_with("panic:") {
                    panic!("boom on {}", addr);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                self.completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    fn binds(list: &[&str]) -> BindAddresses {
        BindAddresses::new(list.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn one_task_per_address_and_waits_for_all() {
        let server = Arc::new(FakeServer::default());
        let addresses = binds(&["a:1", "b:2", "c:3"]);

        let started_at = Instant::now();
        let report = run(&addresses, Arc::clone(&server)).await;

        assert!(started_at.elapsed() >= Duration::from_millis(100));
        assert_eq!(server.started.load(Ordering::SeqCst), 3);
        assert_eq!(server.completed.load(Ordering::SeqCst), 3);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failed_count(), 0);
        let order: Vec<_> = report.outcomes.iter().map(|o| o.address.as_str()).collect();
        assert_eq!(order, vec!["a:1", "b:2", "c:3"]);
    }

    #[tokio::test]
    async fn failures_do_not_cancel_siblings() {
        let server = Arc::new(FakeServer::default());
        let addresses = binds(&["fail:1", "ok:2", "panic:3", "ok:4"]);

        let report = run(&addresses, Arc::clone(&server)).await;

        assert_eq!(server.started.load(Ordering::SeqCst), 4);
        assert_eq!(server.completed.load(Ordering::SeqCst), 2);
        assert_eq!(report.failed_count(), 2);
        assert!(!report.all_failed());

        assert!(matches!(
            report.outcomes[0].result,
            Err(ListenerFailure::Serve(ServeError::NoAddress(_)))
        ));
        assert!(report.outcomes[1].result.is_ok());
        match &report.outcomes[2].result {
            Err(ListenerFailure::Panicked(msg)) => assert_eq!(msg, "boom on panic:3"),
            other => panic!("expected panic outcome, got {:?}", other),
        }
        assert!(report.outcomes[3].result.is_ok());
    }

    #[tokio::test]
    async fn duplicate_addresses_get_separate_tasks() {
        let server = Arc::new(FakeServer::default());
        let report = run(&binds(&["dup:1", "dup:1"]), Arc::clone(&server)).await;
        assert_eq!(server.started.load(Ordering::SeqCst), 2);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn failure_messages() {
        let serve = ListenerFailure::Serve(ServeError::NoAddress("x:1".into()));
        assert_eq!(serve.to_string(), ServeError::NoAddress("x:1".into()).to_string());
        let panicked = ListenerFailure::Panicked("boom".into());
        assert_eq!(panicked.to_string(), "listener task panicked: boom");
    }

    #[tokio::test]
    async fn all_failed_when_every_listener_fails() {
        let server = Arc::new(FakeServer::default());
        let report = run(&binds(&["fail:1", "fail:2"]), server).await;
        assert!(report.all_failed());
    }
}
