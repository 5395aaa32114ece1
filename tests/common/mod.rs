//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use bytes::{Buf, Bytes};
use futures_util::future;
use rcgen::CertifiedKey;
use rustls::pki_types::CertificateDer;
use tempfile::TempDir;

use h3_testbed::config::ServerConfig;

/// Self-signed certificate for `localhost`, written to a temp directory.
pub struct TestCert {
    pub dir: TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub der: CertificateDer<'static>,
}

pub fn test_cert() -> TestCert {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCert {
        dir,
        cert_path,
        key_path,
        der: cert.der().clone(),
    }
}

/// Server configuration pointing at `cert`, binding `binds`.
pub fn test_config(cert: &TestCert, binds: &[&str]) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.tls.cert_path = cert.cert_path.clone();
    config.tls.key_path = cert.key_path.clone();
    config.listener.bind_addresses =
        h3_testbed::config::BindAddresses::new(binds.iter().map(|s| s.to_string()).collect());
    config
}

/// A port that is currently free on loopback for both TCP and UDP.
pub fn free_port() -> u16 {
    loop {
        let tcp = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = tcp.local_addr().unwrap().port();
        if std::net::UdpSocket::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
}

/// Response as seen by the HTTP/3 test client.
pub struct H3Response {
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

/// Minimal HTTP/3 client trusting one certificate.
pub struct H3Client {
    endpoint: quinn::Endpoint,
    connection: quinn::Connection,
    send_request: h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>,
    driver: tokio::task::JoinHandle<()>,
}

impl H3Client {
    pub async fn connect(addr: SocketAddr, cert: &CertificateDer<'static>) -> Self {
        Self::try_connect(addr, cert).await.unwrap()
    }

    /// Like [`H3Client::connect`], but reports a refused or failed handshake.
    pub async fn try_connect(
        addr: SocketAddr,
        cert: &CertificateDer<'static>,
    ) -> Result<Self, String> {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(cert.clone()).unwrap();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut crypto = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13])
            .map_err(|e| e.to_string())?
            .with_root_certificates(roots)
            .with_no_client_auth();
        crypto.alpn_protocols = vec![b"h3".to_vec()];

        let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(crypto).unwrap();
        let mut endpoint = quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
        endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(quic_crypto)));

        let connection = endpoint
            .connect(addr, "localhost")
            .map_err(|e| e.to_string())?
            .await
            .map_err(|e| e.to_string())?;
        let quic = h3_quinn::Connection::new(connection.clone());
        let (mut driver, send_request) =
            h3::client::new(quic).await.map_err(|e| e.to_string())?;
        let driver = tokio::spawn(async move {
            let _ = future::poll_fn(|cx| driver.poll_close(cx)).await;
        });

        Ok(Self {
            endpoint,
            connection,
            send_request,
            driver,
        })
    }

    pub async fn request(&mut self, method: &str, path: &str, body: Option<Bytes>) -> H3Response {
        let request = Request::builder()
            .method(method)
            .uri(format!("https://localhost{}", path))
            .body(())
            .unwrap();

        let mut stream = self.send_request.send_request(request).await.unwrap();
        if let Some(body) = body {
            stream.send_data(body).await.unwrap();
        }
        stream.finish().await.unwrap();

        let response = stream.recv_response().await.unwrap();
        let content_length = response
            .headers()
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let mut out = Vec::new();
        while let Some(mut chunk) = stream.recv_data().await.unwrap() {
            while chunk.has_remaining() {
                let part = chunk.chunk();
                out.extend_from_slice(part);
                let n = part.len();
                chunk.advance(n);
            }
        }

        H3Response {
            status: response.status(),
            content_length,
            body: out,
        }
    }

    pub async fn get(&mut self, path: &str) -> H3Response {
        self.request("GET", path, None).await
    }

    /// Close the connection and wait for the peer to see it.
    pub async fn close(self) {
        self.connection.close(0u32.into(), b"done");
        self.driver.abort();
        self.endpoint.wait_idle().await;
    }
}

/// Poll `check` until it returns true or the timeout expires.
pub async fn eventually<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// All `.qlog` files in `dir`.
pub fn qlog_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "qlog"))
        .collect();
    files.sort();
    files
}
