//! Load-with-retry cycle.

use std::time::Instant;

use crate::engine::{EngineError, LoaderWatcher};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::store::{Store, Values};

/// Everything a load cycle needs, cheap to hand to watch-loop tasks.
#[derive(Debug, Clone)]
pub(crate) struct LoadCycle {
    store: Store,
    metrics: bool,
}

impl LoadCycle {
    pub(crate) fn new(store: Store, metrics: bool) -> Self {
        Self { store, metrics }
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn metrics(&self) -> bool {
        self.metrics
    }

    /// Load until success or until `retry` reaches the loader's `max_retry`,
    /// then merge into the store and run the hooks.
    ///
    /// Hook failures end the cycle without a retry.
    pub(crate) async fn load_retry(
        &self,
        lw: &LoaderWatcher,
        retry: u32,
    ) -> Result<(), EngineError> {
        self.run(lw, retry, None).await
    }

    /// Same cycle, but a triggered `shutdown` abandons any pending back-off and
    /// yields [`EngineError::Interrupted`].
    pub(crate) async fn reload(
        &self,
        lw: &LoaderWatcher,
        shutdown: &mut ShutdownSignal,
    ) -> Result<(), EngineError> {
        self.run(lw, 0, Some(shutdown)).await
    }

    async fn run(
        &self,
        lw: &LoaderWatcher,
        retry: u32,
        mut shutdown: Option<&mut ShutdownSignal>,
    ) -> Result<(), EngineError> {
        let _cycle = lw.lock_cycle().await;
        let loader = lw.loader();

        let mut retry = retry;
        let mut attempts = 0u32;
        let values = loop {
            attempts += 1;
            let mut values = Values::new();
            let started = Instant::now();
            let result = loader.load(&mut values).await;

            if self.metrics {
                metrics::record_load_attempt(loader.name(), result.is_ok(), started);
            }

            let err = match result {
                Ok(()) => break values,
                Err(err) => err,
            };

            let delay = loader.retry_delay();
            if retry < loader.max_retry() {
                tracing::warn!(
                    loader = %loader.name(),
                    attempt = attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "Load failed, retrying"
                );
                if self.metrics {
                    metrics::record_retry(loader.name());
                }
                let interrupted = match shutdown.as_deref_mut() {
                    Some(signal) => tokio::select! {
                        biased;
                        _ = signal.recv() => true,
                        _ = tokio::time::sleep(delay) => false,
                    },
                    None => {
                        tokio::time::sleep(delay).await;
                        false
                    }
                };
                if interrupted {
                    tracing::info!(
                        loader = %loader.name(),
                        attempts,
                        "Shutdown during retry back-off"
                    );
                    return Err(EngineError::Interrupted {
                        loader: loader.name().to_string(),
                    });
                }
                retry += 1;
                continue;
            }

            tracing::error!(
                loader = %loader.name(),
                attempts,
                error = %err,
                "Load failed, no retries left"
            );
            return Err(EngineError::Load {
                loader: loader.name().to_string(),
                attempts,
                source: err,
            });
        };

        tracing::debug!(loader = %loader.name(), keys = values.len(), attempts, "Values loaded");
        self.store.merge(values);

        lw.hooks().run(&self.store).map_err(|source| {
            tracing::error!(loader = %loader.name(), error = %source, "Loader hook failed");
            if self.metrics {
                metrics::record_hook_failure(loader.name());
            }
            EngineError::Hook {
                loader: loader.name().to_string(),
                source,
            }
        })
    }
}
