//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::lifecycle::Shutdown;
use crate::watcher::{WatchError, WatchEvent, Watcher};

/// Raw notification forwarded from the notify callback thread.
type Signal = Result<(), String>;

struct Events {
    rx: mpsc::UnboundedReceiver<Signal>,
    /// Backend error met while coalescing a burst, reported on the next `watch()`.
    deferred: Option<String>,
}

impl Events {
    /// Swallow change signals already queued behind the one just received.
    fn coalesce(&mut self) -> usize {
        let mut merged = 0;
        while let Ok(signal) = self.rx.try_recv() {
            match signal {
                Ok(()) => merged += 1,
                Err(message) => {
                    self.deferred = Some(message);
                    break;
                }
            }
        }
        merged
    }
}

/// A watcher that monitors one file for modifications.
pub struct FileWatcher {
    path: PathBuf,
    poll_interval: Duration,
    inner: Mutex<Option<RecommendedWatcher>>,
    events_tx: mpsc::UnboundedSender<Signal>,
    events: AsyncMutex<Events>,
    closed: Shutdown,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            path: path.into(),
            poll_interval: Duration::from_secs(2),
            inner: Mutex::new(None),
            events_tx,
            events: AsyncMutex::new(Events {
                rx: events_rx,
                deferred: None,
            }),
            closed: Shutdown::new(),
        }
    }

    /// Poll interval used when the platform falls back to a polling backend.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Watcher for FileWatcher {
    async fn start(&self) -> Result<(), WatchError> {
        let tx = self.events_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.send(Ok(()));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e.to_string()));
                }
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);

        tracing::info!(path = %self.path.display(), "File watcher started");
        Ok(())
    }

    async fn watch(&self) -> Result<WatchEvent, WatchError> {
        let mut signal = self.closed.subscribe();
        if signal.is_triggered() {
            return Ok(WatchEvent::Closed);
        }

        let mut events = self.events.lock().await;
        if let Some(message) = events.deferred.take() {
            return Err(WatchError::Source(message));
        }

        let event = tokio::select! {
            biased;
            _ = signal.recv() => return Ok(WatchEvent::Closed),
            event = events.rx.recv() => event,
        };

        match event {
            Some(Ok(())) => {
                let merged = events.coalesce();
                tracing::debug!(path = %self.path.display(), merged, "File change detected");
                Ok(WatchEvent::Changed)
            }
            Some(Err(message)) => Err(WatchError::Source(message)),
            None => Ok(WatchEvent::Closed),
        }
    }

    async fn close(&self) -> Result<(), WatchError> {
        // Dropping the notify watcher stops its background thread.
        let watcher = self.inner.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(watcher);
        self.closed.trigger();
        Ok(())
    }

    async fn done(&self) -> Result<(), WatchError> {
        let mut events = self.events.lock().await;
        events.rx.close();
        while events.rx.try_recv().is_ok() {}
        events.deferred = None;
        Ok(())
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .field("poll_interval", &self.poll_interval)
            .field("closed", &self.closed.is_triggered())
            .finish()
    }
}
