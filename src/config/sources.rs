//! Turn configured sources into engine registrations.

use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{SourceConfig, WatchMode};
use crate::engine::LoaderWatcher;
use crate::loader::{EnvLoader, FileLoader, Loader, RetryPolicy};
use crate::watcher::{FileWatcher, NopWatcher, TickerWatcher, Watcher};

/// Build the loader/watcher pair described by a source entry.
///
/// Expects a validated configuration.
pub fn build_loader_watcher(source: &SourceConfig) -> LoaderWatcher {
    let policy = RetryPolicy::from(source.retry());
    let watch = source.watch();

    let loader: Arc<dyn Loader> = match source {
        SourceConfig::File(file) => {
            let mut loader = FileLoader::new(&file.path).with_policy(policy);
            if let Some(name) = &file.name {
                loader = loader.with_name(name);
            }
            Arc::new(loader)
        }
        SourceConfig::Env(env) => {
            let mut loader = EnvLoader::new(&env.prefix).with_policy(policy);
            if let Some(name) = &env.name {
                loader = loader.with_name(name);
            }
            Arc::new(loader)
        }
    };

    let poll_interval = Duration::from_millis(watch.poll_interval_ms);
    let watcher: Arc<dyn Watcher> = match (watch.watch, source) {
        (WatchMode::Notify, SourceConfig::File(file)) => {
            Arc::new(FileWatcher::new(&file.path).with_poll_interval(poll_interval))
        }
        (WatchMode::Poll, _) => Arc::new(TickerWatcher::new(poll_interval)),
        _ => Arc::new(NopWatcher::new()),
    };

    LoaderWatcher::from_parts(loader, watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DaemonConfig;

    #[test]
    fn test_build_from_config() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [[sources]]
            kind = "file"
            name = "app"
            path = "app.json"
            max_retry = 2
            watch = "notify"

            [[sources]]
            kind = "env"
            prefix = "APP_"
            watch = "poll"
            "#,
        )
        .unwrap();

        let file = build_loader_watcher(&config.sources[0]);
        assert_eq!(file.name(), "app");
        assert_eq!(file.loader().max_retry(), 2);

        let env = build_loader_watcher(&config.sources[1]);
        assert_eq!(env.name(), "env:APP_");
        assert!(!env.loader().stop_on_failure());
    }
}
