//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events to stderr)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → Terminal / log collector
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - qlog traces are a separate concern (see `crate::qlog`)
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
