//! `loadwatch` daemon.
//!
//! Loads every source listed in a TOML config into one store, keeps it current
//! as sources change, and logs each reload until Ctrl-C / SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use loadwatch::config::{self, DaemonConfig};
use loadwatch::lifecycle::signals::shutdown_signal;
use loadwatch::observability::{logging, metrics};
use loadwatch::Engine;

#[derive(Parser)]
#[command(name = "loadwatch")]
#[command(about = "Load configuration sources and keep them current", long_about = None)]
struct Cli {
    /// Daemon configuration file.
    #[arg(short, long, default_value = "loadwatch.toml")]
    config: PathBuf,

    /// Load once, print the merged values as JSON and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config: DaemonConfig = config::load_config(&cli.config)?;
    logging::init(config.observability.log_filter.as_deref());

    tracing::info!(
        config = %cli.config.display(),
        sources = config.sources.len(),
        no_exit_on_error = config.engine.no_exit_on_error,
        "loadwatch v0.1.0 starting"
    );

    if config.engine.metrics {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let mut engine = Engine::new(config.engine.clone());
    for source in &config.sources {
        engine.register_loader_watcher(config::build_loader_watcher(source));
    }

    if cli.once {
        engine.load().await?;
        println!("{}", serde_json::to_string_pretty(&*engine.store().snapshot())?);
        return Ok(());
    }

    if let Err(e) = engine.load_watch().await {
        // Only reachable with no_exit_on_error; keep serving what did load.
        tracing::warn!(error = %e, "Starting with incomplete configuration");
    }
    tracing::info!(
        keys = engine.store().len(),
        watchers = engine.active_watchers(),
        "Configuration loaded"
    );

    shutdown_signal().await;

    for (loader, exit) in engine.shutdown().await {
        tracing::debug!(loader = %loader, reason = exit.as_str(), "Watcher stopped");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
