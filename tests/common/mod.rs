//! Shared utilities for integration tests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use loadwatch::EngineConfig;

/// Engine settings that hand load failures back to the test.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        no_exit_on_error: true,
        metrics: false,
    }
}

/// Write `contents` to `name` inside `dir`, replacing any previous file.
pub fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
