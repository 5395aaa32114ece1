//! Command line flags.
//!
//! Flags are layered over the optional TOML file: anything given on the
//! command line wins.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{BindAddresses, ServeMode, ServerConfig, TraceFailurePolicy};

#[derive(Debug, Parser)]
#[command(name = "h3-testbed")]
#[command(version, about = "HTTP/3 test and benchmark endpoint", long_about = None)]
pub struct Cli {
    /// Verbose (debug level) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Addresses to bind to, comma separated
    #[arg(long = "bind", value_delimiter = ',')]
    pub bind: Vec<String>,

    /// Serve files from this directory
    #[arg(long)]
    pub www: Option<PathBuf>,

    /// Also listen on TCP, with default QUIC transport parameters
    #[arg(long)]
    pub tcp: bool,

    /// Write a qlog file per connection
    #[arg(long)]
    pub qlog: bool,

    /// Directory for qlog files
    #[arg(long)]
    pub qlog_dir: Option<PathBuf>,

    /// What to do when a qlog file cannot be created
    #[arg(long, value_enum)]
    pub qlog_on_error: Option<TraceFailurePolicy>,

    /// Path to the server certificate chain (PEM)
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// Path to the private key (PEM)
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(self, config: &mut ServerConfig) {
        if self.verbose {
            config.observability.verbose = true;
        }
        if !self.bind.is_empty() {
            config.listener.bind_addresses = BindAddresses::new(self.bind);
        }
        if self.www.is_some() {
            config.routes.static_root = self.www;
        }
        if self.tcp {
            config.listener.mode = ServeMode::Plain;
        }
        if self.qlog {
            config.qlog.enabled = true;
        }
        if let Some(dir) = self.qlog_dir {
            config.qlog.directory = dir;
        }
        if let Some(policy) = self.qlog_on_error {
            config.qlog.on_error = policy;
        }
        if let Some(cert) = self.cert_file {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.key_file {
            config.tls.key_path = key;
        }
        if self.metrics_address.is_some() {
            config.observability.metrics_address = self.metrics_address;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::parse_from(["h3-testbed"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.listener.mode, ServeMode::Tuned);
        assert_eq!(config.listener.bind_addresses.to_string(), "localhost:6121");
        assert!(!config.qlog.enabled);
        assert!(config.routes.static_root.is_none());
    }

    #[test]
    fn comma_separated_binds() {
        let cli = Cli::parse_from([
            "h3-testbed",
            "--bind",
            "127.0.0.1:4433,[::1]:4433",
            "--bind",
            "127.0.0.1:4434",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(
            config.listener.bind_addresses.iter().collect::<Vec<_>>(),
            vec!["127.0.0.1:4433", "[::1]:4433", "127.0.0.1:4434"]
        );
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testbed.toml");
        std::fs::write(
            &path,
            r#"
            [listener]
            bind_addresses = ["0.0.0.0:1"]

            [qlog]
            on_error = "abort"
            "#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "h3-testbed",
            "--config",
            path.to_str().unwrap(),
            "--bind",
            "0.0.0.0:2",
            "--tcp",
            "--qlog",
            "--qlog-on-error",
            "warn",
            "-v",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.listener.bind_addresses.to_string(), "0.0.0.0:2");
        assert_eq!(config.listener.mode, ServeMode::Plain);
        assert!(config.qlog.enabled);
        assert_eq!(config.qlog.on_error, TraceFailurePolicy::Warn);
        assert!(config.observability.verbose);
    }
}
