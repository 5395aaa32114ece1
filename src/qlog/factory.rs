//! Trace recorder factory.
//!
//! Invoked by the QUIC listener once per accepted connection. Only installed
//! when tracing is enabled; without it no trace files are produced.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::schema::TraceFailurePolicy;
use crate::net::connection::{ConnectionId, Perspective};
use crate::observability::metrics;
use crate::qlog::tracer::{ConnectionTracer, TraceWriterHandle};
use crate::qlog::writer::BufferedWriteCloser;

/// File extension of trace files.
pub const QLOG_EXTENSION: &str = "qlog";

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to create trace file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds a trace recorder for a new connection.
pub trait TraceFactory: Send + Sync + std::fmt::Debug {
    fn create(
        &self,
        perspective: Perspective,
        id: ConnectionId,
    ) -> BoxFuture<'static, Result<(ConnectionTracer, TraceWriterHandle), TraceError>>;

    /// Policy applied by the caller when [`TraceFactory::create`] fails.
    fn failure_policy(&self) -> TraceFailurePolicy {
        TraceFailurePolicy::Abort
    }
}

/// What the listener should do after a failed trace creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDecision {
    /// Tracing was requested, so a broken trace setup stops the server.
    Abort,
    /// Serve the connection without a trace.
    ContinueUntraced,
}

impl TraceFailurePolicy {
    pub fn on_create_error(&self, err: &TraceError) -> TraceDecision {
        match self {
            TraceFailurePolicy::Abort => {
                tracing::error!(error = %err, "Cannot create qlog file, aborting");
                TraceDecision::Abort
            }
            TraceFailurePolicy::Warn => {
                tracing::warn!(error = %err, "Cannot create qlog file, connection will not be traced");
                TraceDecision::ContinueUntraced
            }
        }
    }
}

/// Writes one `<perspective>_<connection id>.qlog` file per connection.
#[derive(Debug, Clone)]
pub struct QlogFileFactory {
    directory: PathBuf,
    policy: TraceFailurePolicy,
}

impl QlogFileFactory {
    pub fn new(directory: impl Into<PathBuf>, policy: TraceFailurePolicy) -> Self {
        Self {
            directory: directory.into(),
            policy,
        }
    }

    /// Deterministic file name; distinct ids give distinct names.
    pub fn file_name(perspective: Perspective, id: &ConnectionId) -> String {
        format!("{}_{}.{}", perspective, id, QLOG_EXTENSION)
    }

    pub fn path_for(&self, perspective: Perspective, id: &ConnectionId) -> PathBuf {
        self.directory.join(Self::file_name(perspective, id))
    }
}

/// Open a new trace file. An existing file is never reused or truncated.
fn create_trace_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

impl TraceFactory for QlogFileFactory {
    fn create(
        &self,
        perspective: Perspective,
        id: ConnectionId,
    ) -> BoxFuture<'static, Result<(ConnectionTracer, TraceWriterHandle), TraceError>> {
        let path = self.path_for(perspective, &id);
        Box::pin(async move {
            let opened = {
                let path = path.clone();
                tokio::task::spawn_blocking(move || create_trace_file(&path))
                    .await
                    .map_err(std::io::Error::other)
                    .and_then(|opened| opened)
            };
            let file = opened.map_err(|source| TraceError::Create {
                path: path.clone(),
                source,
            })?;

            tracing::info!(path = %path.display(), "Creating qlog file");
            metrics::record_trace_created();

            let sink = BufferedWriteCloser::new(file);
            Ok(ConnectionTracer::spawn(Box::new(sink), perspective, id))
        })
    }

    fn failure_policy(&self) -> TraceFailurePolicy {
        self.policy
    }
}
