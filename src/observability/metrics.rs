//! Metrics collection and exposition.
//!
//! # Metrics
//! - `loadwatch_load_attempts_total` (counter): load attempts by loader, result
//! - `loadwatch_load_retries_total` (counter): retries scheduled by loader
//! - `loadwatch_load_duration_seconds` (histogram): duration of a single attempt
//! - `loadwatch_hook_failures_total` (counter): hook failures by loader
//! - `loadwatch_reloads_total` (counter): watch-triggered reload cycles by loader, result
//! - `loadwatch_watch_exits_total` (counter): watch loop exits by loader, reason
//! - `loadwatch_active_watchers` (gauge): watch loops currently running
//!
//! # Design Decisions
//! - The engine only calls these when its `metrics` flag is set
//! - Recording goes through the `metrics` facade; without an installed recorder it is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_load_attempt(loader: &str, success: bool, started: Instant) {
    let result = if success { "success" } else { "failure" };
    counter!("loadwatch_load_attempts_total", "loader" => loader.to_string(), "result" => result)
        .increment(1);
    histogram!("loadwatch_load_duration_seconds", "loader" => loader.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(loader: &str) {
    counter!("loadwatch_load_retries_total", "loader" => loader.to_string()).increment(1);
}

pub fn record_hook_failure(loader: &str) {
    counter!("loadwatch_hook_failures_total", "loader" => loader.to_string()).increment(1);
}

pub fn record_reload(loader: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("loadwatch_reloads_total", "loader" => loader.to_string(), "result" => result)
        .increment(1);
}

pub fn record_watch_exit(loader: &str, reason: &'static str) {
    counter!("loadwatch_watch_exits_total", "loader" => loader.to_string(), "reason" => reason)
        .increment(1);
}

pub fn record_active_watchers(delta: f64) {
    gauge!("loadwatch_active_watchers").increment(delta);
}
