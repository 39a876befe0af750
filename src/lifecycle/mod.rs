//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Engine::shutdown → trigger → every watch loop moves to Closing → handles joined
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls Engine::shutdown
//! ```
//!
//! # Design Decisions
//! - One sticky trigger shared by all tasks, no per-task cancellation plumbing
//! - Watchers reuse the same primitive for their own `close()`

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
