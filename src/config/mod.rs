//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! daemon config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//!     → sources.rs builds one LoaderWatcher per [[sources]] entry
//!     → EngineConfig handed to the Engine
//! ```
//!
//! # Design Decisions
//! - The daemon config is read once at startup; only sources are hot-reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod sources;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DaemonConfig, EngineConfig, ObservabilityConfig, SourceConfig, WatchMode};
pub use sources::build_loader_watcher;
