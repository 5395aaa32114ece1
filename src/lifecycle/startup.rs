//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Load TLS material
//! - Build the shared router and, when enabled, the trace factory
//! - Hand everything to the supervisor
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and happens before listeners start
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;

use crate::config::{validate_config, ServerConfig, ValidationError};
use crate::http::build_router;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::supervisor::{self, SupervisorReport};
use crate::net::error::TlsError;
use crate::net::tls::TlsMaterial;
use crate::net::transport::Transport;
use crate::qlog::{QlogFileFactory, TraceFactory};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Build the trace factory if tracing is enabled.
pub fn trace_factory(config: &ServerConfig) -> Option<Arc<dyn TraceFactory>> {
    if !config.qlog.enabled {
        return None;
    }
    tracing::info!(directory = %config.qlog.directory.display(), "qlog output enabled");
    Some(Arc::new(QlogFileFactory::new(
        config.qlog.directory.clone(),
        config.qlog.on_error,
    )))
}

/// Assemble the shared transport from a configuration.
pub fn build_transport(
    config: &ServerConfig,
    shutdown: Arc<Shutdown>,
) -> Result<Transport, StartupError> {
    validate_config(config).map_err(StartupError::Config)?;

    let tls = TlsMaterial::from_pem_files(&config.tls.cert_path, &config.tls.key_path)?;
    let router = build_router(&config.routes);

    Ok(Transport::new(
        router,
        trace_factory(config),
        tls,
        config.listener.mode,
        config.transport.clone(),
        shutdown,
    ))
}

/// Start every listener and wait for all of them to end.
pub async fn run(
    config: &ServerConfig,
    shutdown: Arc<Shutdown>,
) -> Result<SupervisorReport, StartupError> {
    let transport = Arc::new(build_transport(config, shutdown)?);

    tracing::info!(
        binds = %config.listener.bind_addresses,
        mode = ?transport.mode(),
        "Starting listeners"
    );

    Ok(supervisor::run(&config.listener.bind_addresses, transport).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_factory_when_disabled() {
        let config = ServerConfig::default();
        assert!(trace_factory(&config).is_none());
    }

    #[test]
    fn factory_when_enabled() {
        let mut config = ServerConfig::default();
        config.qlog.enabled = true;
        assert!(trace_factory(&config).is_some());
    }

    #[test]
    fn missing_certificate_is_fatal_before_listening() {
        let mut config = ServerConfig::default();
        config.tls.cert_path = "/nonexistent/cert.pem".into();
        config.tls.key_path = "/nonexistent/key.pem".into();

        let err = build_transport(&config, Arc::new(Shutdown::new())).err().unwrap();
        match err {
            StartupError::Config(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }
}
