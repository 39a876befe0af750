//! Per-loader watch loop.
//!
//! # States
//! ```text
//! Starting → Watching → (Reloading → Watching)* → Closing → Done
//! ```
//! - Starting happens in the engine before the loop is spawned
//! - Watching: wait for the watcher or the engine shutdown signal
//! - Reloading: one load-with-retry cycle; failure ends the loop only when the
//!   loader reports `stop_on_failure()`. Shutdown during a retry back-off ends it too
//! - Closing: `close()` then `done()`, errors logged and ignored

use std::sync::Arc;

use crate::engine::retry::LoadCycle;
use crate::engine::{EngineError, LoaderWatcher};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::watcher::WatchEvent;

/// Why a watch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The watcher reported a clean end.
    Ended,
    /// The watcher returned an error.
    WatchFailed,
    /// A reload failed and the loader asked to stop on failure.
    ReloadFailed,
    /// The engine was shut down.
    Shutdown,
}

impl WatchExit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchExit::Ended => "ended",
            WatchExit::WatchFailed => "watch_failed",
            WatchExit::ReloadFailed => "reload_failed",
            WatchExit::Shutdown => "shutdown",
        }
    }
}

pub(crate) async fn watch_loop(
    cycle: LoadCycle,
    lw: Arc<LoaderWatcher>,
    mut shutdown: ShutdownSignal,
) -> WatchExit {
    let name = lw.name().to_string();
    if cycle.metrics() {
        metrics::record_active_watchers(1.0);
    }
    tracing::info!(loader = %name, "Watching for changes");

    let exit = loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.recv() => break WatchExit::Shutdown,
            event = lw.watcher().watch() => event,
        };

        match event {
            Ok(WatchEvent::Changed) => {
                tracing::info!(loader = %name, "Change detected, reloading");
                let result = cycle.reload(&lw, &mut shutdown).await;
                if let Err(EngineError::Interrupted { .. }) = result {
                    break WatchExit::Shutdown;
                }
                if cycle.metrics() {
                    metrics::record_reload(&name, result.is_ok());
                }

                match result {
                    Ok(()) => tracing::info!(loader = %name, "Reload complete"),
                    Err(err) if lw.loader().stop_on_failure() => {
                        tracing::error!(
                            loader = %name,
                            error = %err,
                            "Reload failed, stopping watcher"
                        );
                        break WatchExit::ReloadFailed;
                    }
                    Err(err) => {
                        tracing::warn!(
                            loader = %name,
                            error = %err,
                            "Reload failed, keeping previous values"
                        );
                    }
                }
            }
            Ok(WatchEvent::Closed) => {
                tracing::info!(loader = %name, "Watcher ended");
                break WatchExit::Ended;
            }
            Err(err) => {
                tracing::warn!(loader = %name, error = %err, "Watcher failed");
                break WatchExit::WatchFailed;
            }
        }
    };

    close_watcher(&lw).await;

    tracing::info!(loader = %name, reason = exit.as_str(), "Watch loop stopped");
    if cycle.metrics() {
        metrics::record_watch_exit(&name, exit.as_str());
        metrics::record_active_watchers(-1.0);
    }
    exit
}

/// Best-effort `close()` then `done()`.
pub(crate) async fn close_watcher(lw: &LoaderWatcher) {
    if let Err(e) = lw.watcher().close().await {
        tracing::warn!(loader = %lw.name(), error = %e, "Failed to close watcher");
    }
    if let Err(e) = lw.watcher().done().await {
        tracing::warn!(loader = %lw.name(), error = %e, "Watcher did not finish cleanly");
    }
}
