//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that TLS material exists on disk
//! - Check directories the server writes to or serves from
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before any listener starts

use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cert file {0} does not exist")]
    MissingCertFile(PathBuf),

    #[error("key file {0} does not exist")]
    MissingKeyFile(PathBuf),

    #[error("static root {0} is not a directory")]
    StaticRootNotDirectory(PathBuf),

    #[error("qlog directory {0} is not a directory")]
    QlogDirNotDirectory(PathBuf),

    #[error("no bind address configured")]
    NoBindAddress,

    #[error("metrics address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.tls.cert_path.exists() {
        errors.push(ValidationError::MissingCertFile(config.tls.cert_path.clone()));
    }
    if !config.tls.key_path.exists() {
        errors.push(ValidationError::MissingKeyFile(config.tls.key_path.clone()));
    }

    if config.listener.bind_addresses.is_empty() {
        errors.push(ValidationError::NoBindAddress);
    }

    if let Some(root) = &config.routes.static_root {
        if !root.is_dir() {
            errors.push(ValidationError::StaticRootNotDirectory(root.clone()));
        }
    }

    if config.qlog.enabled && !config.qlog.directory.is_dir() {
        errors.push(ValidationError::QlogDirNotDirectory(config.qlog.directory.clone()));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
