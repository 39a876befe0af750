//! Reloadable configuration store.
//!
//! Values are pulled from pluggable loaders into a shared [`Store`]. Each loader is
//! paired with a watcher; the [`Engine`] loads every pair with bounded retry, runs
//! post-load hooks, then reloads on every change notification until the watcher
//! ends or the engine shuts down.

pub mod config;
pub mod engine;
pub mod hooks;
pub mod lifecycle;
pub mod loader;
pub mod observability;
pub mod store;
pub mod watcher;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError, LoaderWatcher, WatchExit};
pub use hooks::{HookError, LoaderHooks};
pub use lifecycle::Shutdown;
pub use loader::{LoadError, Loader};
pub use store::{Store, Value, Values};
pub use watcher::{WatchError, WatchEvent, Watcher};
