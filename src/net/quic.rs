//! QUIC / HTTP/3 listener.
//!
//! # Responsibilities
//! - Own one quinn endpoint bound to one address
//! - Accept connections; one task per connection, one per request
//! - Install a per-connection tracer when a trace factory is configured
//! - Stop accepting on shutdown and wait for every connection, trace
//!   included, to finish

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use tokio::task::JoinSet;

use crate::http::bridge::serve_request;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::net::connection::{ConnectionId, ConnectionTracker, Perspective};
use crate::net::error::ServeError;
use crate::qlog::{
    CloseStats, ConnectionTracer, TraceDecision, TraceError, TraceEvent, TraceFactory,
    TraceWriterHandle,
};

/// Everything a connection needs, shared read-only across connections.
#[derive(Clone)]
pub struct ConnectionContext {
    pub router: Router,
    pub trace_factory: Option<Arc<dyn TraceFactory>>,
    pub tracker: ConnectionTracker,
    /// Fatal trace failures stop the whole server through this.
    pub shutdown: Arc<Shutdown>,
}

/// A bound QUIC endpoint serving HTTP/3.
pub struct QuicListener {
    endpoint: quinn::Endpoint,
    local_addr: SocketAddr,
}

impl QuicListener {
    /// Bind a server endpoint on `addr`.
    pub fn bind(addr: SocketAddr, server_config: quinn::ServerConfig) -> Result<Self, ServeError> {
        let endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|source| ServeError::Bind { addr, source })?;
        let local_addr = endpoint
            .local_addr()
            .map_err(|source| ServeError::Bind { addr, source })?;

        tracing::info!(address = %local_addr, "QUIC endpoint bound");

        Ok(Self {
            endpoint,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until shutdown or until the endpoint closes.
    ///
    /// Returns only after every connection task ended and its trace file,
    /// if any, has been flushed and closed.
    pub async fn run(
        self,
        ctx: ConnectionContext,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ServeError> {
        let listener = self.local_addr;
        let mut connections = JoinSet::new();

        let result = loop {
            tokio::select! {
                incoming = self.endpoint.accept() => {
                    let Some(incoming) = incoming else {
                        break Err(ServeError::EndpointClosed(listener));
                    };
                    connections.spawn(handle_connection(incoming, ctx.clone(), listener));
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown.recv() => {
                    tracing::info!(address = %listener, "Shutdown signal received, closing QUIC endpoint");
                    self.endpoint.close(0u32.into(), b"shutdown");
                    break Ok(());
                }
            }
        };

        self.endpoint.wait_idle().await;
        while connections.join_next().await.is_some() {}
        tracing::info!(address = %listener, "QUIC listener stopped");
        result
    }
}

/// Create the trace for a new connection according to the factory's policy.
///
/// `Ok(None)` means the connection is served untraced. An error means the
/// failure is fatal for the server.
async fn start_trace(
    factory: &dyn TraceFactory,
    id: ConnectionId,
) -> Result<Option<(ConnectionTracer, TraceWriterHandle)>, TraceError> {
    match factory.create(Perspective::Server, id).await {
        Ok(trace) => Ok(Some(trace)),
        Err(e) => match factory.failure_policy().on_create_error(&e) {
            TraceDecision::Abort => Err(e),
            TraceDecision::ContinueUntraced => Ok(None),
        },
    }
}

async fn handle_connection(
    incoming: quinn::Incoming,
    ctx: ConnectionContext,
    listener: SocketAddr,
) {
    let guard = ctx.tracker.track();
    let connection_id = guard.id();

    let trace = match ctx.trace_factory.as_deref() {
        Some(factory) => match start_trace(factory, connection_id).await {
            Ok(trace) => trace,
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "Stopping server after trace failure");
                ctx.shutdown.fail(e.to_string());
                incoming.refuse();
                return;
            }
        },
        None => None,
    };
    let (tracer, writer) = match trace {
        Some((tracer, writer)) => (Some(tracer), Some(writer)),
        None => (None, None),
    };

    serve_connection(incoming, &ctx.router, listener, connection_id, tracer).await;

    // Resolves once the request tasks have dropped their tracer clones too.
    if let Some(writer) = writer {
        if let Err(e) = writer.finished().await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to flush qlog file");
        }
    }
}

async fn serve_connection(
    incoming: quinn::Incoming,
    router: &Router,
    listener: SocketAddr,
    connection_id: ConnectionId,
    tracer: Option<ConnectionTracer>,
) {
    let remote_addr = incoming.remote_address();

    if let Some(tracer) = &tracer {
        tracer.record(TraceEvent::ConnectionStarted {
            listener: listener.to_string(),
            src_ip: remote_addr.ip().to_string(),
            src_port: remote_addr.port(),
        });
    }

    let connection = match incoming.accept() {
        Ok(connecting) => connecting.await,
        Err(e) => Err(e),
    };
    let connection = match connection {
        Ok(connection) => connection,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, peer_addr = %remote_addr, error = %e, "Handshake failed");
            if let Some(tracer) = &tracer {
                tracer.record(TraceEvent::ConnectionClosed {
                    reason: e.to_string(),
                    stats: CloseStats::default(),
                });
            }
            return;
        }
    };

    let alpn = negotiated_alpn(&connection);
    tracing::debug!(
        connection_id = %connection_id,
        peer_addr = %remote_addr,
        alpn = alpn.as_deref().unwrap_or("-"),
        "QUIC connection established"
    );
    if let Some(tracer) = &tracer {
        tracer.record(TraceEvent::handshake_complete(alpn));
    }

    serve_h3(&connection, router, tracer.as_ref()).await;

    let reason = connection
        .close_reason()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "h3 session ended".to_string());
    tracing::debug!(connection_id = %connection_id, reason = %reason, "QUIC connection finished");

    if let Some(tracer) = &tracer {
        tracer.record(TraceEvent::ConnectionClosed {
            reason,
            stats: close_stats(&connection.stats()),
        });
    }
}

async fn serve_h3(
    connection: &quinn::Connection,
    router: &Router,
    tracer: Option<&ConnectionTracer>,
) {
    let quic = h3_quinn::Connection::new(connection.clone());
    let mut h3_conn = match h3::server::Connection::<_, Bytes>::new(quic).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!(error = %e, "HTTP/3 setup failed");
            return;
        }
    };

    let mut request_seq: u64 = 0;
    loop {
        match h3_conn.accept().await {
            Ok(Some(resolver)) => {
                let (request, stream) = match resolver.resolve_request().await {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        tracing::debug!(error = %e, "Failed to resolve request");
                        continue;
                    }
                };

                let router = router.clone();
                let tracer = tracer.cloned();
                let seq = request_seq;
                request_seq += 1;

                tokio::spawn(async move {
                    if let Err(e) = serve_request(request, stream, router, tracer, seq).await {
                        tracing::debug!(error = %e, "HTTP/3 request failed");
                    }
                });
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "HTTP/3 connection ended");
                break;
            }
        }
    }
}

fn negotiated_alpn(connection: &quinn::Connection) -> Option<String> {
    let data = connection.handshake_data()?;
    let data = data.downcast_ref::<quinn::crypto::rustls::HandshakeData>()?;
    data.protocol
        .as_ref()
        .map(|p| String::from_utf8_lossy(p).into_owned())
}

fn close_stats(stats: &quinn::ConnectionStats) -> CloseStats {
    CloseStats {
        rtt_ms: stats.path.rtt.as_secs_f64() * 1000.0,
        congestion_window: stats.path.cwnd,
        sent_packets: stats.path.sent_packets,
        lost_packets: stats.path.lost_packets,
        lost_bytes: stats.path.lost_bytes,
        congestion_events: stats.path.congestion_events,
        udp_tx_bytes: stats.udp_tx.bytes,
        udp_rx_bytes: stats.udp_rx.bytes,
    }
}
