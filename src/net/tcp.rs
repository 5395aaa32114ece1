//! TCP + TLS listener for plain mode.
//!
//! Serves the same router over HTTP/1.1 and HTTP/2 and advertises the
//! HTTP/3 endpoint with `alt-svc`, so clients can upgrade.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::lifecycle::ShutdownSignal;
use crate::net::error::ServeError;

/// How long in-flight TCP requests may run after shutdown is requested.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// `alt-svc` value pointing at the HTTP/3 endpoint on `port`.
pub fn alt_svc_value(port: u16) -> String {
    format!("h3=\":{}\"; ma=2592000", port)
}

/// Serve `router` over TLS on `addr` until shutdown or failure.
pub async fn serve_tcp(
    addr: SocketAddr,
    router: Router,
    tls: RustlsConfig,
    quic_port: u16,
    mut shutdown: ShutdownSignal,
) -> Result<(), ServeError> {
    let alt_svc = HeaderValue::try_from(alt_svc_value(quic_port))
        .map_err(|e| ServeError::Transport(e.to_string()))?;
    let app = router.layer(SetResponseHeaderLayer::overriding(header::ALT_SVC, alt_svc));

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    let watcher = tokio::spawn(async move {
        shutdown.recv().await;
        shutdown_handle.graceful_shutdown(Some(GRACE_PERIOD));
    });

    tracing::info!(address = %addr, "TCP listener starting");
    let served = axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await;
    watcher.abort();
    served.map_err(|source| ServeError::Tcp { addr, source })?;

    tracing::info!(address = %addr, "TCP listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_svc_names_quic_port() {
        assert_eq!(alt_svc_value(6121), "h3=\":6121\"; ma=2592000");
        assert!(HeaderValue::try_from(alt_svc_value(443)).is_ok());
    }
}
