//! Environment variable loader.

use std::ffi::OsString;
use std::time::Duration;

use async_trait::async_trait;

use crate::loader::{LoadError, Loader, RetryPolicy};
use crate::store::Values;

/// Loads every environment variable starting with a prefix.
///
/// `APP_SERVER__PORT=8080` with prefix `APP_` becomes `server.port = "8080"`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    name: String,
    prefix: String,
    policy: RetryPolicy,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            name: format!("env:{prefix}"),
            prefix,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn key_for(&self, var: &str) -> Option<String> {
        let rest = var.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.to_lowercase().replace("__", "."))
    }

    fn collect<I>(&self, vars: I, values: &mut Values)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (var, value) in vars {
            if let Some(key) = self.key_for(&var) {
                values.set(key, value);
            }
        }
    }
}

/// Variables that are not valid UTF-8 are skipped rather than aborting the load.
fn utf8_var((var, value): (OsString, OsString)) -> Option<(String, String)> {
    match (var.into_string(), value.into_string()) {
        (Ok(var), Ok(value)) => Some((var, value)),
        (Ok(var), Err(_)) => {
            tracing::debug!(var = %var, "Skipping environment variable with non UTF-8 value");
            None
        }
        (Err(var), _) => {
            tracing::debug!(var = ?var, "Skipping environment variable with non UTF-8 name");
            None
        }
    }
}

#[async_trait]
impl Loader for EnvLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, values: &mut Values) -> Result<(), LoadError> {
        self.collect(std::env::vars_os().filter_map(utf8_var), values);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;

    #[test]
    fn test_prefix_and_nesting() {
        let loader = EnvLoader::new("APP_");
        let vars = vec![
            ("APP_SERVER__PORT".to_string(), "8080".to_string()),
            ("APP_DEBUG".to_string(), "true".to_string()),
            ("APP_".to_string(), "ignored".to_string()),
            ("OTHER_VAR".to_string(), "ignored".to_string()),
        ];

        let mut values = Values::new();
        loader.collect(vars, &mut values);

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("server.port"), Some(&Value::from("8080")));
        assert_eq!(values.get("debug"), Some(&Value::from("true")));
    }

    #[tokio::test]
    async fn test_load_reads_process_env() {
        let loader = EnvLoader::new("LOADWATCH_ENV_LOADER_TEST_");
        std::env::set_var("LOADWATCH_ENV_LOADER_TEST_LEVEL", "debug");

        let mut values = Values::new();
        loader.load(&mut values).await.unwrap();

        assert_eq!(values.get("level"), Some(&Value::from("debug")));
        std::env::remove_var("LOADWATCH_ENV_LOADER_TEST_LEVEL");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_skips_non_utf8_variables() {
        use std::os::unix::ffi::OsStringExt;

        let bad = OsString::from_vec(vec![0x66, 0xff, 0x6f]);
        std::env::set_var("LOADWATCH_ENV_LOADER_BAD_VALUE", &bad);
        std::env::set_var("LOADWATCH_ENV_LOADER_UTF8_NAME", "kept");

        let loader = EnvLoader::new("LOADWATCH_ENV_LOADER_");
        let mut values = Values::new();
        let result = loader.load(&mut values).await;

        std::env::remove_var("LOADWATCH_ENV_LOADER_BAD_VALUE");
        std::env::remove_var("LOADWATCH_ENV_LOADER_UTF8_NAME");

        assert!(result.is_ok());
        assert_eq!(values.get("utf8_name"), Some(&Value::from("kept")));
        assert_eq!(values.get("bad_value"), None);
    }
}
