//! TLS configuration and certificate loading.
//!
//! One PEM certificate chain and key feed both transports: QUIC (TLS 1.3,
//! ALPN `h3`) and, in plain mode, TCP (ALPN `h2`, `http/1.1`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use quinn::crypto::rustls::QuicServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::net::error::TlsError;

pub const ALPN_H3: &[u8] = b"h3";
pub const ALPN_H2: &[u8] = b"h2";
pub const ALPN_HTTP11: &[u8] = b"http/1.1";

/// Parsed certificate chain and private key.
#[derive(Debug)]
pub struct TlsMaterial {
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Clone for TlsMaterial {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            key: self.key.clone_key(),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.display().to_string(),
            source,
        })
}

impl TlsMaterial {
    /// Load certificate chain and key from PEM files.
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let certs = rustls_pemfile::certs(&mut open(cert_path)?)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TlsError::Read {
                path: cert_path.display().to_string(),
                source,
            })?;
        if certs.is_empty() {
            return Err(TlsError::NoCertificates(cert_path.display().to_string()));
        }

        let key = rustls_pemfile::private_key(&mut open(key_path)?)
            .map_err(|source| TlsError::Read {
                path: key_path.display().to_string(),
                source,
            })?
            .ok_or_else(|| TlsError::NoPrivateKey(key_path.display().to_string()))?;

        Ok(Self { certs, key })
    }

    fn server_config(
        &self,
        tls13_only: bool,
        alpn: &[&[u8]],
    ) -> Result<rustls::ServerConfig, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ServerConfig::builder_with_provider(provider);
        let builder = if tls13_only {
            builder.with_protocol_versions(&[&rustls::version::TLS13])?
        } else {
            builder.with_safe_default_protocol_versions()?
        };

        let mut config = builder
            .with_no_client_auth()
            .with_single_cert(self.certs.clone(), self.key.clone_key())?;
        config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
        Ok(config)
    }

    /// QUIC server configuration with default transport parameters.
    pub fn quic_server_config(&self) -> Result<quinn::ServerConfig, TlsError> {
        let mut tls = self.server_config(true, &[ALPN_H3])?;
        tls.max_early_data_size = u32::MAX;
        let crypto = QuicServerConfig::try_from(tls)?;
        Ok(quinn::ServerConfig::with_crypto(Arc::new(crypto)))
    }

    /// TLS configuration for the TCP listener.
    pub fn tcp_config(&self) -> Result<RustlsConfig, TlsError> {
        let tls = self.server_config(false, &[ALPN_H2, ALPN_HTTP11])?;
        Ok(RustlsConfig::from_config(Arc::new(tls)))
    }
}
