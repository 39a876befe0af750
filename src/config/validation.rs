//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll intervals > 0, addresses parse)
//! - Reject watch modes a source cannot support
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DaemonConfig, SourceConfig, WatchMode};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no sources configured")]
    NoSources,

    #[error("source #{index}: {field} must not be empty")]
    Empty { index: usize, field: &'static str },

    #[error("source #{index}: poll_interval_ms must be greater than zero")]
    ZeroPollInterval { index: usize },

    #[error("source #{index}: watch = \"notify\" is only supported for file sources")]
    NotifyUnsupported { index: usize },

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
}

/// Validate a parsed daemon configuration.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.sources.is_empty() {
        errors.push(ValidationError::NoSources);
    }

    for (index, source) in config.sources.iter().enumerate() {
        match source {
            SourceConfig::File(file) if file.path.trim().is_empty() => {
                errors.push(ValidationError::Empty { index, field: "path" });
            }
            SourceConfig::Env(env) => {
                if env.prefix.is_empty() {
                    errors.push(ValidationError::Empty { index, field: "prefix" });
                }
                if env.watch.watch == WatchMode::Notify {
                    errors.push(ValidationError::NotifyUnsupported { index });
                }
            }
            SourceConfig::File(_) => {}
        }

        let watch = source.watch();
        if watch.watch == WatchMode::Poll && watch.poll_interval_ms == 0 {
            errors.push(ValidationError::ZeroPollInterval { index });
        }
    }

    if config.engine.metrics
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> DaemonConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
            [[sources]]
            kind = "file"
            path = "app.toml"
            watch = "poll"
            poll_interval_ms = 1000
            "#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = parse(
            r#"
            [engine]
            metrics = true

            [observability]
            metrics_address = "not-an-address"

            [[sources]]
            kind = "file"
            path = ""
            watch = "poll"
            poll_interval_ms = 0

            [[sources]]
            kind = "env"
            prefix = "APP_"
            watch = "notify"
            "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Empty { index: 0, field: "path" },
                ValidationError::ZeroPollInterval { index: 0 },
                ValidationError::NotifyUnsupported { index: 1 },
                ValidationError::MetricsAddress("not-an-address".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_sources() {
        let errors = validate_config(&DaemonConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoSources]);
    }
}
