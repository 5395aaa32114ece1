//! h3-testbed
//!
//! An HTTP/3 server used to exercise and benchmark QUIC clients.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      H3 TESTBED                       │
//!                     │                                                       │
//!   --bind a,b,c ─────┼─▶ supervisor ──▶ one task per address               │
//!                     │                     │                                 │
//!                     │                     ▼                                 │
//!                     │        ┌──────────────────────────┐                   │
//!   QUIC client ──────┼──────▶ │  net::quic (quinn + h3)  │──┐                │
//!                     │        └──────────────────────────┘  │                │
//!   TCP client ───────┼──────▶ net::tcp (--tcp only) ────────┤                │
//!                     │                                      ▼                │
//!                     │                         http::router (axum)           │
//!                     │                  /<n> · /demo/* · static files        │
//!                     │                                                       │
//!                     │   qlog: one trace file per QUIC connection            │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;

use h3_testbed::config::Cli;
use h3_testbed::lifecycle::signals::spawn_signal_handler;
use h3_testbed::lifecycle::startup::{self, StartupError};
use h3_testbed::lifecycle::Shutdown;
use h3_testbed::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Process-wide crypto provider for rustls.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = cli.into_config()?;
    logging::init(config.observability.verbose);

    tracing::info!("h3-testbed v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        binds = %config.listener.bind_addresses,
        mode = ?config.listener.mode,
        static_root = ?config.routes.static_root,
        qlog = config.qlog.enabled,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(Arc::clone(&shutdown));

    let report = match startup::run(&config, Arc::clone(&shutdown)).await {
        Ok(report) => report,
        Err(StartupError::Config(errors)) => {
            for error in &errors {
                tracing::error!(error = %error, "Invalid configuration");
            }
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            std::process::exit(1);
        }
    };

    if report.failed_count() > 0 {
        tracing::warn!(
            failed = report.failed_count(),
            total = report.outcomes.len(),
            "Some listeners failed"
        );
    }
    if let Some(cause) = shutdown.fatal_cause() {
        tracing::error!(cause = %cause, "Stopped after fatal error");
        std::process::exit(1);
    }
    if report.all_failed() {
        return Err("all listeners failed".into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
