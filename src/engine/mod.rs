//! Load/retry/watch orchestration engine.
//!
//! # Data Flow
//! ```text
//! register_loader_watcher (one or more)
//!     → load / load_watch
//!         → initial load-with-retry per pair, concurrently (retry.rs)
//!         → merge into Store, run hooks
//!         → failures aggregated; fatal handler unless no_exit_on_error
//!     → load_watch only: start each watcher, spawn its watch loop (watch.rs)
//!         → every change notification reruns the load-with-retry cycle
//!     → shutdown: trigger, close every watcher, join every loop
//! ```
//!
//! # Design Decisions
//! - Pairs are independent: one pair failing never touches another's state
//! - Watch loops are tracked by handle so shutdown can join them
//! - Process exit is an injected policy, not hardwired into the engine

mod loader_watcher;
mod retry;
mod watch;


use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::hooks::HookError;
use crate::lifecycle::Shutdown;
use crate::loader::LoadError;
use crate::store::Store;
use crate::watcher::WatchError;

pub use loader_watcher::LoaderWatcher;
pub use watch::WatchExit;

use retry::LoadCycle;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A loader kept failing until its retries ran out.
    #[error("loader `{loader}` failed after {attempts} attempt(s): {source}")]
    Load {
        loader: String,
        attempts: u32,
        #[source]
        source: LoadError,
    },

    /// A post-load hook rejected the loaded values.
    #[error("hook failed for loader `{loader}`: {source}")]
    Hook {
        loader: String,
        #[source]
        source: HookError,
    },

    /// A watcher could not be started.
    #[error("watcher for loader `{loader}` failed to start: {source}")]
    WatcherStart {
        loader: String,
        #[source]
        source: WatchError,
    },

    /// Shutdown arrived while a reload was waiting to retry.
    #[error("reload of loader `{loader}` interrupted by shutdown")]
    Interrupted { loader: String },

    /// More than one loader failed.
    #[error("{} loaders failed: {}", .0.len(), join(.0))]
    Multiple(Vec<EngineError>),
}

impl EngineError {
    /// Name of the failing loader, `None` for aggregates.
    pub fn loader(&self) -> Option<&str> {
        match self {
            EngineError::Load { loader, .. }
            | EngineError::Hook { loader, .. }
            | EngineError::WatcherStart { loader, .. }
            | EngineError::Interrupted { loader } => Some(loader),
            EngineError::Multiple(_) => None,
        }
    }

    fn aggregate(mut errors: Vec<EngineError>) -> Option<EngineError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(EngineError::Multiple(errors)),
        }
    }
}

fn join(errors: &[EngineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Called with the aggregated error when an initial load fails and
/// `no_exit_on_error` is off.
pub type FatalHandler = Arc<dyn Fn(&EngineError) + Send + Sync>;

fn exit_process(err: &EngineError) {
    tracing::error!(error = %err, "Unrecoverable configuration load failure, exiting");
    std::process::exit(1);
}

struct WatchTask {
    loader: String,
    handle: JoinHandle<WatchExit>,
}

/// Drives registered loader/watcher pairs through load, retry and reload.
pub struct Engine {
    config: EngineConfig,
    cycle: LoadCycle,
    loader_watchers: Vec<Arc<LoaderWatcher>>,
    tasks: Mutex<Vec<WatchTask>>,
    shutdown: Shutdown,
    fatal: FatalHandler,
}

impl Engine {
    /// Create an engine writing into a fresh store.
    pub fn new(config: EngineConfig) -> Self {
        let cycle = LoadCycle::new(Store::new(), config.metrics);
        Self {
            config,
            cycle,
            loader_watchers: Vec::new(),
            tasks: Mutex::new(Vec::new()),
            shutdown: Shutdown::new(),
            fatal: Arc::new(exit_process),
        }
    }

    /// Write into an existing store, e.g. one shared with other engines.
    pub fn with_store(mut self, store: Store) -> Self {
        self.cycle = LoadCycle::new(store, self.config.metrics);
        self
    }

    /// Replace the default escalation, which exits the process.
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.fatal = handler;
        self
    }

    pub fn register_loader_watcher(&mut self, lw: LoaderWatcher) -> &mut Self {
        tracing::debug!(loader = %lw.name(), hooks = lw.hooks().len(), "Loader registered");
        self.loader_watchers.push(Arc::new(lw));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        self.cycle.store()
    }

    pub fn loader_watchers(&self) -> &[Arc<LoaderWatcher>] {
        &self.loader_watchers
    }

    /// Run one load-with-retry cycle for `lw`, starting at retry count `retry`.
    pub async fn load_retry(&self, lw: &LoaderWatcher, retry: u32) -> Result<(), EngineError> {
        self.cycle.load_retry(lw, retry).await
    }

    /// Load every registered pair once, without watching.
    pub async fn load(&self) -> Result<(), EngineError> {
        let errors = self
            .initial_load()
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        self.escalate(errors)
    }

    /// Load every registered pair, then start watching.
    ///
    /// A pair whose initial load failed is still watched unless its loader
    /// stops on failure, in which case its watcher is closed without starting.
    /// Returns once every watch loop is spawned.
    pub async fn load_watch(&self) -> Result<(), EngineError> {
        let results = self.initial_load().await;

        let mut errors = Vec::new();
        for (lw, result) in self.loader_watchers.iter().zip(results) {
            if let Err(err) = result {
                errors.push(err);
                if lw.loader().stop_on_failure() {
                    tracing::warn!(loader = %lw.name(), "Initial load failed, watcher not started");
                    if let Err(e) = lw.watcher().close().await {
                        tracing::warn!(loader = %lw.name(), error = %e, "Failed to close watcher");
                    }
                    continue;
                }
            }

            if let Err(err) = self.start_watching(lw).await {
                errors.push(err);
            }
        }

        self.escalate(errors)
    }

    /// Start watching every registered pair without an initial load.
    pub async fn watch(&self) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        for lw in &self.loader_watchers {
            if let Err(err) = self.start_watching(lw).await {
                errors.push(err);
            }
        }
        self.escalate(errors)
    }

    /// Number of watch loops still running.
    pub fn active_watchers(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    /// Stop every watch loop and wait for them to finish.
    pub async fn shutdown(&self) -> Vec<(String, WatchExit)> {
        self.shutdown.trigger();

        let tasks = self.take_tasks();
        tracing::info!(watchers = tasks.len(), "Shutting down watch loops");

        let mut exits = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.handle.await {
                Ok(exit) => exits.push((task.loader, exit)),
                Err(e) => tracing::error!(loader = %task.loader, error = %e, "Watch loop panicked"),
            }
        }
        exits
    }

    /// Drop registrations, stored values and running loops.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&mut self) {
        for task in self.take_tasks() {
            task.handle.abort();
        }
        self.loader_watchers.clear();
        self.cycle.store().reset();
        self.shutdown = Shutdown::new();
    }

    fn take_tasks(&self) -> Vec<WatchTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn initial_load(&self) -> Vec<Result<(), EngineError>> {
        join_all(
            self.loader_watchers
                .iter()
                .map(|lw| self.cycle.load_retry(lw, 0)),
        )
        .await
    }

    async fn start_watching(&self, lw: &Arc<LoaderWatcher>) -> Result<(), EngineError> {
        lw.watcher()
            .start()
            .await
            .map_err(|source| EngineError::WatcherStart {
                loader: lw.name().to_string(),
                source,
            })?;

        let handle = tokio::spawn(watch::watch_loop(
            self.cycle.clone(),
            Arc::clone(lw),
            self.shutdown.subscribe(),
        ));

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(WatchTask {
                loader: lw.name().to_string(),
                handle,
            });
        Ok(())
    }

    fn escalate(&self, errors: Vec<EngineError>) -> Result<(), EngineError> {
        let Some(err) = EngineError::aggregate(errors) else {
            return Ok(());
        };

        if self.config.no_exit_on_error {
            tracing::error!(error = %err, "Configuration load failed");
        } else {
            (self.fatal)(&err);
        }
        Err(err)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("loader_watchers", &self.loader_watchers)
            .field("active_watchers", &self.active_watchers())
            .finish()
    }
}
