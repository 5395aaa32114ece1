//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Load TLS → Build router + trace factory → Supervisor
//!
//! Supervisor (supervisor.rs):
//!     One task per bind address → join all → report
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → trigger → listeners stop accepting → drain → return
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then TLS, then listeners
//! - Listener failures are reported, never propagated to siblings
//! - No restarts

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use supervisor::{Serve, SupervisorReport};
