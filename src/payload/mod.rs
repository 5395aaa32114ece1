//! Synthetic payload subsystem.
//!
//! # Data Flow
//! ```text
//! GET /<n>
//!     → http router validates 0 < n <= MAX_PAYLOAD_LEN
//!     → generator.rs (Lehmer sequence, fresh state per request)
//!     → PayloadStream (64 KiB chunks) → response body
//! ```
//!
//! # Design Decisions
//! - Single global seed: the same length always yields the same bytes,
//!   across runs and processes
//! - Output for `n` is a prefix of the output for any `m > n`
//! - Bodies are streamed so a 1 GiB response never sits in memory

pub mod generator;

pub use generator::{generate, LehmerGenerator, PayloadStream, MAX_PAYLOAD_LEN};
