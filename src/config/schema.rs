//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the testbed.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address used when no bind address is configured.
pub const DEFAULT_BIND_ADDRESS: &str = "localhost:6121";

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind addresses, serving mode).
    pub listener: ListenerConfig,

    /// Certificate and key locations.
    pub tls: TlsConfig,

    /// Request routing (static root).
    pub routes: RouteConfig,

    /// Per-connection diagnostic traces.
    pub qlog: QlogConfig,

    /// QUIC transport parameters for the tuned mode.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ordered set of bind addresses. Never empty once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BindAddresses(Vec<String>);

impl BindAddresses {
    pub fn new(addresses: Vec<String>) -> Self {
        let mut binds = Self(addresses);
        binds.normalize();
        binds
    }

    /// Drop blank entries and fall back to the default address.
    /// Duplicates are kept on purpose: each one gets its own listener.
    pub fn normalize(&mut self) {
        self.0.retain(|a| !a.trim().is_empty());
        if self.0.is_empty() {
            self.0.push(DEFAULT_BIND_ADDRESS.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BindAddresses {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Display for BindAddresses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// How every listener in one run serves traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// QUIC with default transport parameters plus HTTP/1.1 and HTTP/2
    /// over TLS on the same TCP port. No tracer.
    Plain,
    /// QUIC only, with tuned transport parameters and the tracer hook.
    #[default]
    Tuned,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind addresses; one listener per entry.
    pub bind_addresses: BindAddresses,

    /// Serving mode applied to all listeners.
    pub mode: ServeMode,
}

/// TLS material. Both paths are required.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM).
    pub cert_path: PathBuf,

    /// Path to private key (PEM).
    pub key_path: PathBuf,
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteConfig {
    /// Serve files from this directory instead of synthetic payloads.
    pub static_root: Option<PathBuf>,
}

/// What to do when a trace file cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TraceFailurePolicy {
    /// Log and terminate the process.
    #[default]
    Abort,
    /// Log and serve the connection without a trace.
    Warn,
}

/// Diagnostic trace configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QlogConfig {
    /// Write one qlog file per connection.
    pub enabled: bool,

    /// Directory receiving trace files.
    pub directory: PathBuf,

    /// Behaviour when a trace file cannot be opened.
    pub on_error: TraceFailurePolicy,
}

impl Default for QlogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("."),
            on_error: TraceFailurePolicy::Abort,
        }
    }
}

/// QUIC transport tuning, applied in [`ServeMode::Tuned`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Idle timeout in seconds.
    pub max_idle_timeout_secs: u64,

    /// Keep-alive interval in seconds (0 disables).
    pub keep_alive_interval_secs: u64,

    /// Concurrent bidirectional streams a peer may open.
    pub max_concurrent_bidi_streams: u32,

    /// Concurrent unidirectional streams a peer may open.
    pub max_concurrent_uni_streams: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_idle_timeout_secs: 30,
            keep_alive_interval_secs: 0,
            max_concurrent_bidi_streams: 1_000,
            max_concurrent_uni_streams: 100,
        }
    }
}

impl TransportConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.max_idle_timeout_secs)
    }

    pub fn keep_alive_interval(&self) -> Option<Duration> {
        match self.keep_alive_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Debug-level logging.
    pub verbose: bool,

    /// Prometheus scrape address; metrics exporter is off when unset.
    pub metrics_address: Option<String>,
}
