//! Per-connection diagnostic traces.
//!
//! # Data Flow
//! ```text
//! QUIC listener accepts a connection
//!     → factory.rs (name + open <perspective>_<id>.qlog)
//!     → writer.rs (buffered write-closer over the file)
//!     → tracer.rs (handle cloned into request tasks, single writer task)
//!     → event.rs (JSON-SEQ qlog records)
//!
//! Connection and all its request tasks done
//!     → last tracer handle dropped
//!     → flush, then close, exactly once
//! ```
//!
//! # Design Decisions
//! - One sink per connection, owned by one writer; no shared files
//! - Close ordering is flush first, then release; both always attempted
//! - Trace creation failure follows the configured policy

pub mod event;
pub mod factory;
pub mod tracer;
pub mod writer;

pub use event::{CloseStats, TraceEvent};
pub use factory::{QlogFileFactory, TraceDecision, TraceError, TraceFactory};
pub use tracer::{ConnectionTracer, TraceWriterHandle};
pub use writer::{BufferedWriteCloser, Close, WriteCloser};
