//! HTTP/3 test and benchmark endpoint.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod payload;
pub mod qlog;

pub use config::schema::ServerConfig;
pub use lifecycle::Shutdown;
