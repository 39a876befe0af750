//! Configuration schema definitions.
//!
//! This module defines the engine settings and the daemon configuration file.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::loader::RetryPolicy;

/// Settings consumed by the load/watch engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Return initial load failures to the caller instead of escalating them
    /// to the fatal handler (which exits the process by default).
    pub no_exit_on_error: bool,

    /// Record load, retry and watch metrics.
    pub metrics: bool,
}

/// Root configuration for the `loadwatch` daemon.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Engine behaviour.
    pub engine: EngineConfig,

    /// Logging and metrics exposition.
    pub observability: ObservabilityConfig,

    /// Configuration sources, registered in declaration order.
    pub sources: Vec<SourceConfig>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Prometheus metrics endpoint address, used when `engine.metrics` is set.
    pub metrics_address: String,

    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_address: "127.0.0.1:9090".to_string(),
            log_filter: None,
        }
    }
}

/// A single configuration source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A TOML or JSON file.
    File(FileSourceConfig),
    /// Prefixed environment variables.
    Env(EnvSourceConfig),
}

impl SourceConfig {
    pub fn name(&self) -> Option<&str> {
        match self {
            SourceConfig::File(file) => file.name.as_deref(),
            SourceConfig::Env(env) => env.name.as_deref(),
        }
    }

    pub fn retry(&self) -> &SourceRetryConfig {
        match self {
            SourceConfig::File(file) => &file.retry,
            SourceConfig::Env(env) => &env.retry,
        }
    }

    pub fn watch(&self) -> &WatchConfig {
        match self {
            SourceConfig::File(file) => &file.watch,
            SourceConfig::Env(env) => &env.watch,
        }
    }
}

/// File source configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileSourceConfig {
    /// Loader name for logs and metrics (defaults to `file:<path>`).
    #[serde(default)]
    pub name: Option<String>,

    /// Path to the configuration file.
    pub path: String,

    #[serde(flatten)]
    pub retry: SourceRetryConfig,

    #[serde(flatten)]
    pub watch: WatchConfig,
}

/// Environment source configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnvSourceConfig {
    /// Loader name for logs and metrics (defaults to `env:<prefix>`).
    #[serde(default)]
    pub name: Option<String>,

    /// Variable prefix, stripped from the resulting keys.
    pub prefix: String,

    #[serde(flatten)]
    pub retry: SourceRetryConfig,

    #[serde(flatten)]
    pub watch: WatchConfig,
}

/// Per-source retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceRetryConfig {
    /// Retries after a failed load attempt.
    pub max_retry: u32,

    /// Delay before each retry in milliseconds.
    pub retry_delay_ms: u64,

    /// End the watch loop when a reload fails.
    pub stop_on_failure: bool,
}

impl Default for SourceRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retry: policy.max_retry,
            retry_delay_ms: policy.retry_delay.as_millis() as u64,
            stop_on_failure: policy.stop_on_failure,
        }
    }
}

impl From<&SourceRetryConfig> for RetryPolicy {
    fn from(config: &SourceRetryConfig) -> Self {
        RetryPolicy {
            max_retry: config.max_retry,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            stop_on_failure: config.stop_on_failure,
        }
    }
}

/// How a source is watched for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Load once, never reload.
    #[default]
    None,
    /// File system notifications (file sources only).
    Notify,
    /// Reload every `poll_interval_ms`.
    Poll,
}

/// Per-source watch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub watch: WatchMode,

    /// Poll interval in milliseconds for `watch = "poll"`.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch: WatchMode::None,
            poll_interval_ms: 5_000,
        }
    }
}
