//! File-backed loader.
//!
//! # Responsibilities
//! - Read a TOML or JSON document from disk
//! - Flatten nested tables into dot-separated keys (`server.port`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::loader::{LoadError, Loader, RetryPolicy};
use crate::store::{Value, Values};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    /// Guess the format from the file extension, defaulting to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

/// Loads values from a single configuration file.
#[derive(Debug, Clone)]
pub struct FileLoader {
    name: String,
    path: PathBuf,
    format: FileFormat,
    policy: RetryPolicy,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            format: FileFormat::from_path(&path),
            path,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.policy.max_retry = max_retry;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.policy.retry_delay = delay;
        self
    }

    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.policy.stop_on_failure = stop;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<Value, LoadError> {
        let parse_err = |message: String| LoadError::Parse {
            path: self.path.clone(),
            message,
        };

        let document = match self.format {
            FileFormat::Toml => {
                let table: toml::Table = content
                    .parse()
                    .map_err(|e: toml::de::Error| parse_err(e.to_string()))?;
                serde_json::to_value(table).map_err(|e| parse_err(e.to_string()))?
            }
            FileFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
            }
        };

        if !document.is_object() {
            return Err(parse_err("top-level value must be a table".to_string()));
        }
        Ok(document)
    }
}

#[async_trait]
impl Loader for FileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, values: &mut Values) -> Result<(), LoadError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;

        let document = self.parse(&content)?;
        flatten_into(values, "", document);

        tracing::debug!(path = %self.path.display(), keys = values.len(), "File loaded");
        Ok(())
    }

    fn max_retry(&self) -> u32 {
        self.policy.max_retry
    }

    fn retry_delay(&self) -> Duration {
        self.policy.retry_delay
    }

    fn stop_on_failure(&self) -> bool {
        self.policy.stop_on_failure
    }
}

/// Flatten nested objects into dot-separated keys. Arrays are kept as values.
fn flatten_into(values: &mut Values, prefix: &str, value: Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(values, &path, nested);
            }
        }
        other => {
            if !prefix.is_empty() {
                values.set(prefix, other);
            }
        }
    }
}
