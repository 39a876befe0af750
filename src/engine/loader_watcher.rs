//! Loader/watcher pairing: the unit the engine orchestrates.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::hooks::LoaderHooks;
use crate::loader::Loader;
use crate::watcher::Watcher;

/// One loader, the watcher that triggers its reloads, and its post-load hooks.
///
/// Load cycles for the same pair never overlap: the engine holds the cycle lock
/// from the first attempt until the last hook returned.
pub struct LoaderWatcher {
    loader: Arc<dyn Loader>,
    watcher: Arc<dyn Watcher>,
    hooks: LoaderHooks,
    cycle: Mutex<()>,
}

impl LoaderWatcher {
    pub fn new<L, W>(loader: L, watcher: W) -> Self
    where
        L: Loader + 'static,
        W: Watcher + 'static,
    {
        Self::from_parts(Arc::new(loader), Arc::new(watcher))
    }

    pub fn from_parts(loader: Arc<dyn Loader>, watcher: Arc<dyn Watcher>) -> Self {
        Self {
            loader,
            watcher,
            hooks: LoaderHooks::default(),
            cycle: Mutex::new(()),
        }
    }

    /// Attach post-load hooks, replacing any set before.
    pub fn with_hooks(mut self, hooks: LoaderHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &str {
        self.loader.name()
    }

    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }

    pub fn watcher(&self) -> &dyn Watcher {
        self.watcher.as_ref()
    }

    pub fn hooks(&self) -> &LoaderHooks {
        &self.hooks
    }

    pub(crate) async fn lock_cycle(&self) -> MutexGuard<'_, ()> {
        self.cycle.lock().await
    }
}

impl fmt::Debug for LoaderWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderWatcher")
            .field("loader", &self.loader.name())
            .field("hooks", &self.hooks)
            .finish()
    }
}
