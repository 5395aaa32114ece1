//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bind address (one per supervisor task)
//!     → transport.rs (resolve, pick mode)
//!     → tls.rs (QUIC / TCP TLS configs from one PEM pair)
//!     → quic.rs (endpoint accept loop, per-connection tracer)
//!     → tcp.rs (plain mode only: HTTP/1.1 + HTTP/2 with alt-svc)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Incoming → Handshaking → Serving requests → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection gets an ID at accept time for tracing
//! - Listener errors end that listener only

pub mod connection;
pub mod error;
pub mod quic;
pub mod tcp;
pub mod tls;
pub mod transport;

pub use connection::{ConnectionId, ConnectionTracker, Perspective};
pub use error::{ServeError, TlsError};
pub use quic::{ConnectionContext, QuicListener};
pub use tls::TlsMaterial;
pub use transport::Transport;
