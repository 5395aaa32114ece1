//! Per-address serving, as driven by the supervisor.
//!
//! One `Transport` is shared by all listeners. It resolves an address,
//! builds the QUIC endpoint for the configured mode and serves until
//! shutdown or failure.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use futures_util::future::BoxFuture;

use crate::config::{ServeMode, TransportConfig};
use crate::lifecycle::supervisor::Serve;
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::error::ServeError;
use crate::net::quic::{ConnectionContext, QuicListener};
use crate::net::tcp::serve_tcp;
use crate::net::tls::TlsMaterial;
use crate::qlog::TraceFactory;

/// Shared, read-only serving state.
pub struct Transport {
    router: Router,
    trace_factory: Option<Arc<dyn TraceFactory>>,
    tls: TlsMaterial,
    mode: ServeMode,
    tuning: TransportConfig,
    tracker: ConnectionTracker,
    shutdown: Arc<Shutdown>,
}

impl Transport {
    pub fn new(
        router: Router,
        trace_factory: Option<Arc<dyn TraceFactory>>,
        tls: TlsMaterial,
        mode: ServeMode,
        tuning: TransportConfig,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        if mode == ServeMode::Plain && trace_factory.is_some() {
            tracing::warn!("qlog output is not written in plain mode");
        }
        Self {
            router,
            trace_factory,
            tls,
            mode,
            tuning,
            tracker: ConnectionTracker::new(),
            shutdown,
        }
    }

    pub fn mode(&self) -> ServeMode {
        self.mode
    }

    /// QUIC server configuration for this transport's mode.
    pub fn quic_server_config(&self) -> Result<quinn::ServerConfig, ServeError> {
        let mut config = self.tls.quic_server_config()?;
        if self.mode == ServeMode::Tuned {
            config.transport_config(Arc::new(tuned_transport(&self.tuning)?));
        }
        Ok(config)
    }

    fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            router: self.router.clone(),
            trace_factory: match self.mode {
                ServeMode::Tuned => self.trace_factory.clone(),
                ServeMode::Plain => None,
            },
            tracker: self.tracker.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    async fn serve_address(&self, addr: &str) -> Result<(), ServeError> {
        let socket_addr = resolve(addr).await?;
        let quic = QuicListener::bind(socket_addr, self.quic_server_config()?)?;
        let quic_port = quic.local_addr().port();
        let ctx = self.connection_context();

        match self.mode {
            ServeMode::Tuned => quic.run(ctx, self.shutdown.subscribe()).await,
            ServeMode::Plain => {
                let tcp = serve_tcp(
                    socket_addr,
                    self.router.clone(),
                    self.tls.tcp_config()?,
                    quic_port,
                    self.shutdown.subscribe(),
                );
                tokio::try_join!(quic.run(ctx, self.shutdown.subscribe()), tcp).map(|_| ())
            }
        }
    }
}

impl Serve for Transport {
    fn serve(self: Arc<Self>, addr: String) -> BoxFuture<'static, Result<(), ServeError>> {
        Box::pin(async move { self.serve_address(&addr).await })
    }
}

/// Resolve `host:port` to the first socket address.
pub async fn resolve(addr: &str) -> Result<SocketAddr, ServeError> {
    let mut addrs = tokio::net::lookup_host(addr)
        .await
        .map_err(|source| ServeError::Resolve {
            addr: addr.to_string(),
            source,
        })?;
    addrs
        .next()
        .ok_or_else(|| ServeError::NoAddress(addr.to_string()))
}

/// Transport parameters for tuned mode.
pub fn tuned_transport(tuning: &TransportConfig) -> Result<quinn::TransportConfig, ServeError> {
    let idle_timeout = quinn::IdleTimeout::try_from(tuning.idle_timeout())
        .map_err(|e| ServeError::Transport(format!("idle timeout: {}", e)))?;

    let mut transport = quinn::TransportConfig::default();
    transport
        .max_idle_timeout(Some(idle_timeout))
        .keep_alive_interval(tuning.keep_alive_interval())
        .max_concurrent_bidi_streams(quinn::VarInt::from_u32(tuning.max_concurrent_bidi_streams))
        .max_concurrent_uni_streams(quinn::VarInt::from_u32(tuning.max_concurrent_uni_streams));
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_literal_address() {
        let addr = resolve("127.0.0.1:6121").await.unwrap();
        assert_eq!(addr, "127.0.0.1:6121".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn unresolvable_address_is_error() {
        let err = resolve("not an address").await.unwrap_err();
        assert!(matches!(err, ServeError::Resolve { .. }));
    }

    #[test]
    fn tuned_transport_accepts_defaults() {
        assert!(tuned_transport(&TransportConfig::default()).is_ok());
    }
}
