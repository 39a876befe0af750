//! Watcher that never reports a change.

use async_trait::async_trait;

use crate::lifecycle::Shutdown;
use crate::watcher::{WatchError, WatchEvent, Watcher};

/// Pairs with loaders that should only load once but still go through the
/// engine's watch lifecycle.
#[derive(Debug, Default)]
pub struct NopWatcher {
    closed: Shutdown,
}

impl NopWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Watcher for NopWatcher {
    async fn start(&self) -> Result<(), WatchError> {
        Ok(())
    }

    async fn watch(&self) -> Result<WatchEvent, WatchError> {
        self.closed.subscribe().recv().await;
        Ok(WatchEvent::Closed)
    }

    async fn close(&self) -> Result<(), WatchError> {
        self.closed.trigger();
        Ok(())
    }

    async fn done(&self) -> Result<(), WatchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_close_ends_pending_watch() {
        let watcher = Arc::new(NopWatcher::new());
        watcher.start().await.unwrap();

        let pending = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        watcher.close().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("watch should return after close")
            .unwrap()
            .unwrap();
        assert_eq!(event, WatchEvent::Closed);
    }
}
