//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (cli.rs) ─┐
//! config file (TOML)     ├→ loader.rs (parse & deserialize)
//!                        → flags layered over file values
//!                        → validation.rs (semantic checks)
//!                        → ServerConfig (validated, immutable)
//!                        → passed by reference / Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no component reads globals
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{
    BindAddresses, ListenerConfig, QlogConfig, RouteConfig, ServeMode, ServerConfig, TlsConfig,
    TraceFailurePolicy, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
