//! Change watchers.
//!
//! # Data Flow
//! ```text
//! Watcher::start            (acquire OS handles, timers, subscriptions)
//!     → Watcher::watch      (resolves once per change notification)
//!     → engine reloads the paired loader
//!     ...
//!     → Watcher::close      (makes a pending or future watch() return Closed)
//!     → Watcher::done       (release anything still held)
//! ```
//!
//! # Design Decisions
//! - `watch()` distinguishes a clean end (`Ok(WatchEvent::Closed)`) from a failure (`Err`)
//! - `watch()` must be cancel-safe; the engine races it against its shutdown signal
//! - `close()` is the only cancellation primitive a watcher needs to honour

pub mod file;
pub mod nop;
pub mod ticker;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileWatcher;
pub use nop::NopWatcher;
pub use ticker::TickerWatcher;

/// Outcome of a successful `watch()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// The source changed; the paired loader should reload.
    Changed,
    /// The watcher ended cleanly and will not notify again.
    Closed,
}

/// Errors produced by watcher lifecycle calls.
#[derive(Debug, Error)]
pub enum WatchError {
    /// File system notification backend failure.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// `watch()` was called before `start()` succeeded.
    #[error("watcher not started")]
    NotStarted,

    /// Any other watcher-specific failure.
    #[error("{0}")]
    Source(String),
}

impl WatchError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

/// A source of change notifications.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Begin watching. Called once before the first `watch()`.
    async fn start(&self) -> Result<(), WatchError>;

    /// Wait for the next change or for the watcher to end.
    async fn watch(&self) -> Result<WatchEvent, WatchError>;

    /// Stop watching; pending and future `watch()` calls return `Closed`.
    async fn close(&self) -> Result<(), WatchError>;

    /// Release remaining resources after `close()`.
    async fn done(&self) -> Result<(), WatchError>;
}
