//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! QUIC connection (net::quic)
//!     → bridge.rs (resolve request stream, stream request body)
//!     → router.rs (axum Router: payload / static / demo)
//!     → body.rs (content-length when the body knows it)
//!     → bridge.rs (send headers, stream body, finish)
//!
//! TCP/TLS connection (plain mode, net::tcp)
//!     → axum-server → router.rs
//! ```

pub mod body;
pub mod bridge;
pub mod demo;
pub mod router;

pub use body::KnownLength;
pub use router::{build_router, parse_payload_len};
