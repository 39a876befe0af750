//! Scriptable loader and watcher doubles for exercising the engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::Instant;

use crate::engine::LoaderWatcher;
use crate::lifecycle::Shutdown;
use crate::loader::{LoadError, Loader};
use crate::store::Values;
use crate::watcher::{WatchError, WatchEvent, Watcher};

/// A capability call observed by a double.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Name,
    Load,
    MaxRetry,
    RetryDelay,
    StopOnFailure,
    Start,
    Watch,
    Close,
    Done,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Mutex<Vec<Call>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn snapshot(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }
}

/// Loader whose load results are scripted up front.
#[derive(Debug)]
pub struct MockLoader {
    name: String,
    max_retry: u32,
    retry_delay: Duration,
    stop_on_failure: bool,
    load_delay: Duration,
    produce: Values,
    script: Mutex<VecDeque<Result<(), String>>>,
    fallback: Result<(), String>,
    log: CallLog,
    loads: Mutex<Vec<(Instant, Values)>>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

impl MockLoader {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_retry: 0,
            retry_delay: Duration::from_millis(1),
            stop_on_failure: false,
            load_delay: Duration::ZERO,
            produce: Values::new(),
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(()),
            log: CallLog::default(),
            loads: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }

    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Time each load call spends before returning.
    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Values written on every successful load.
    pub fn produce(mut self, values: Values) -> Self {
        self.produce = values;
        self
    }

    /// Queue a failing load.
    pub fn then_fail(self, message: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    /// Queue a successful load.
    pub fn then_succeed(self) -> Self {
        self.script.lock().unwrap().push_back(Ok(()));
        self
    }

    /// Result once the script is exhausted.
    pub fn always_fail(mut self, message: &str) -> Self {
        self.fallback = Err(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.snapshot()
    }

    pub fn count(&self, call: Call) -> usize {
        self.log.count(call)
    }

    /// Values each load call received, with the time it started.
    pub fn loads(&self) -> Vec<(Instant, Values)> {
        self.loads.lock().unwrap().clone()
    }

    /// Whether two load calls ever ran at the same time.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Loader for MockLoader {
    fn name(&self) -> &str {
        self.log.push(Call::Name);
        &self.name
    }

    async fn load(&self, values: &mut Values) -> Result<(), LoadError> {
        self.log.push(Call::Load);
        self.loads.lock().unwrap().push((Instant::now(), values.clone()));
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }

        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let result = next.unwrap_or_else(|| self.fallback.clone());
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                for (key, value) in &self.produce {
                    values.set(key.clone(), value.clone());
                }
                Ok(())
            }
            Err(message) => Err(LoadError::other(message)),
        }
    }

    fn max_retry(&self) -> u32 {
        self.log.push(Call::MaxRetry);
        self.max_retry
    }

    fn retry_delay(&self) -> Duration {
        self.log.push(Call::RetryDelay);
        self.retry_delay
    }

    fn stop_on_failure(&self) -> bool {
        self.log.push(Call::StopOnFailure);
        self.stop_on_failure
    }
}

/// Watcher driven by the test through [`MockWatcher::notify`] and friends.
///
/// With nothing queued, `watch()` waits until an event is pushed or the
/// watcher is closed.
#[derive(Debug)]
pub struct MockWatcher {
    start_error: Option<String>,
    events_tx: mpsc::UnboundedSender<Result<WatchEvent, String>>,
    events_rx: AsyncMutex<mpsc::UnboundedReceiver<Result<WatchEvent, String>>>,
    closed: Shutdown,
    log: CallLog,
}

impl MockWatcher {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            start_error: None,
            events_tx,
            events_rx: AsyncMutex::new(events_rx),
            closed: Shutdown::new(),
            log: CallLog::default(),
        }
    }

    /// Make `start()` fail.
    pub fn fail_start(mut self, message: &str) -> Self {
        self.start_error = Some(message.to_string());
        self
    }

    /// Report a change.
    pub fn notify(&self) {
        let _ = self.events_tx.send(Ok(WatchEvent::Changed));
    }

    /// End watching cleanly.
    pub fn end(&self) {
        let _ = self.events_tx.send(Ok(WatchEvent::Closed));
    }

    /// End watching with an error.
    pub fn fail(&self, message: &str) {
        let _ = self.events_tx.send(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.snapshot()
    }

    pub fn count(&self, call: Call) -> usize {
        self.log.count(call)
    }
}

impl Default for MockWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Watcher for MockWatcher {
    async fn start(&self) -> Result<(), WatchError> {
        self.log.push(Call::Start);
        match &self.start_error {
            Some(message) => Err(WatchError::other(message.clone())),
            None => Ok(()),
        }
    }

    async fn watch(&self) -> Result<WatchEvent, WatchError> {
        self.log.push(Call::Watch);
        let mut signal = self.closed.subscribe();
        let mut events = self.events_rx.lock().await;
        tokio::select! {
            biased;
            _ = signal.recv() => Ok(WatchEvent::Closed),
            event = events.recv() => match event {
                Some(Ok(event)) => Ok(event),
                Some(Err(message)) => Err(WatchError::other(message)),
                None => Ok(WatchEvent::Closed),
            },
        }
    }

    async fn close(&self) -> Result<(), WatchError> {
        self.log.push(Call::Close);
        self.closed.trigger();
        Ok(())
    }

    async fn done(&self) -> Result<(), WatchError> {
        self.log.push(Call::Done);
        Ok(())
    }
}

/// Pair two doubles, keeping handles to both for assertions.
pub fn pair(
    loader: MockLoader,
    watcher: MockWatcher,
) -> (LoaderWatcher, Arc<MockLoader>, Arc<MockWatcher>) {
    let loader = Arc::new(loader);
    let watcher = Arc::new(watcher);
    let lw = LoaderWatcher::from_parts(loader.clone(), watcher.clone());
    (lw, loader, watcher)
}
