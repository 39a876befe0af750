//! Interval-based watcher for sources that have no change feed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::lifecycle::Shutdown;
use crate::watcher::{WatchError, WatchEvent, Watcher};

/// Reports a change every `interval`, so the paired loader polls its source.
#[derive(Debug)]
pub struct TickerWatcher {
    period: Duration,
    ticker: Mutex<Option<Interval>>,
    closed: Shutdown,
}

impl TickerWatcher {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: Mutex::new(None),
            closed: Shutdown::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Watcher for TickerWatcher {
    async fn start(&self) -> Result<(), WatchError> {
        if self.period.is_zero() {
            return Err(WatchError::other("ticker period must be greater than zero"));
        }

        // First tick one full period from now, not immediately.
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *self.ticker.lock().await = Some(ticker);

        tracing::debug!(period_ms = self.period.as_millis() as u64, "Ticker watcher started");
        Ok(())
    }

    async fn watch(&self) -> Result<WatchEvent, WatchError> {
        let mut signal = self.closed.subscribe();
        if signal.is_triggered() {
            return Ok(WatchEvent::Closed);
        }

        let mut guard = self.ticker.lock().await;
        let ticker = guard.as_mut().ok_or(WatchError::NotStarted)?;

        tokio::select! {
            biased;
            _ = signal.recv() => Ok(WatchEvent::Closed),
            _ = ticker.tick() => Ok(WatchEvent::Changed),
        }
    }

    async fn close(&self) -> Result<(), WatchError> {
        self.closed.trigger();
        Ok(())
    }

    async fn done(&self) -> Result<(), WatchError> {
        self.ticker.lock().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_each_period() {
        let watcher = TickerWatcher::new(Duration::from_secs(5));
        watcher.start().await.unwrap();

        let started = Instant::now();
        assert_eq!(watcher.watch().await.unwrap(), WatchEvent::Changed);
        assert_eq!(watcher.watch().await.unwrap(), WatchEvent::Changed);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_watch_before_start_fails() {
        let watcher = TickerWatcher::new(Duration::from_secs(1));
        assert!(matches!(watcher.watch().await, Err(WatchError::NotStarted)));
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let watcher = TickerWatcher::new(Duration::ZERO);
        assert!(watcher.start().await.is_err());
    }

    #[tokio::test]
    async fn test_closed_watcher_returns_closed() {
        let watcher = TickerWatcher::new(Duration::from_secs(60));
        watcher.start().await.unwrap();
        watcher.close().await.unwrap();

        assert_eq!(watcher.watch().await.unwrap(), WatchEvent::Closed);
        watcher.done().await.unwrap();
    }
}
