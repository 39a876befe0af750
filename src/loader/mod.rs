//! Configuration loaders.
//!
//! # Data Flow
//! ```text
//! engine creates an empty Values per attempt
//!     → Loader::load fills it from its source
//!     → on success the engine merges it into the Store
//!     → on failure the engine consults max_retry / retry_delay
//! ```
//!
//! # Design Decisions
//! - Loaders never touch the Store directly; a failed attempt leaves no partial writes
//! - Retry policy is reported by the loader itself, the engine only enforces it
//! - `name()` is for diagnostics only

pub mod env;
pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::Values;

pub use env::EnvLoader;
pub use file::{FileFormat, FileLoader};

/// Errors produced by a loader attempt.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source was read but its content is invalid.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Any other source-specific failure.
    #[error("{0}")]
    Source(String),
}

impl LoadError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

/// A source of configuration values with its own retry policy.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Loader name for logging and metrics.
    fn name(&self) -> &str;

    /// Fill `values` from the source.
    async fn load(&self, values: &mut Values) -> Result<(), LoadError>;

    /// Maximum number of retries after a failed attempt.
    fn max_retry(&self) -> u32;

    /// Delay before each retry.
    fn retry_delay(&self) -> Duration;

    /// Whether a failed reload ends the watch loop for this loader.
    fn stop_on_failure(&self) -> bool;
}

/// Retry settings shared by the built-in loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry: u32,
    pub retry_delay: Duration,
    pub stop_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 0,
            retry_delay: Duration::from_millis(100),
            stop_on_failure: false,
        }
    }
}
