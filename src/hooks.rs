//! Post-load hooks.
//!
//! Hooks validate or transform the store after a loader wrote into it. They run in
//! registration order and stop at the first failure. Side effects of hooks that
//! already ran are kept, so each hook must be safe to run again on the next load.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::store::Store;

/// Error returned by a failing hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A single post-load hook.
pub type Hook = Arc<dyn Fn(&Store) -> Result<(), HookError> + Send + Sync>;

/// Ordered sequence of hooks attached to a loader.
#[derive(Clone, Default)]
pub struct LoaderHooks {
    hooks: Vec<Hook>,
}

impl LoaderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it runs after every hook added before it.
    pub fn with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Store) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order, returning the first error.
    pub fn run(&self, store: &Store) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook(store)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LoaderHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_run_all_hooks_no_error() {
        let total = Arc::new(AtomicUsize::new(0));
        let (t1, t2, t3) = (total.clone(), total.clone(), total.clone());
        let hooks = LoaderHooks::new()
            .with(move |_| {
                t1.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with(move |_| {
                t2.fetch_add(2, Ordering::SeqCst);
                Ok(())
            })
            .with(move |_| {
                t3.fetch_add(3, Ordering::SeqCst);
                Ok(())
            });

        assert!(hooks.run(&Store::new()).is_ok());
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_first_error_stops_run() {
        let total = Arc::new(AtomicUsize::new(0));
        let (t1, t2, t3) = (total.clone(), total.clone(), total.clone());
        let hooks = LoaderHooks::new()
            .with(move |_| {
                t1.fetch_add(1, Ordering::SeqCst);
                Err("err".into())
            })
            .with(move |_| {
                t2.fetch_add(2, Ordering::SeqCst);
                Ok(())
            })
            .with(move |_| {
                t3.fetch_add(3, Ordering::SeqCst);
                Ok(())
            });

        let err = hooks.run(&Store::new()).unwrap_err();
        assert_eq!(err.message(), "err");
        assert_eq!(total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hooks_run_in_order_and_see_store() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (o1, o2) = (order.clone(), order.clone());
        let hooks = LoaderHooks::new()
            .with(move |store| {
                o1.lock().unwrap().push("set");
                store.set("derived", 42);
                Ok(())
            })
            .with(move |store| {
                o2.lock().unwrap().push("check");
                match store.get("derived") {
                    Some(_) => Ok(()),
                    None => Err(HookError::new("derived key missing")),
                }
            });

        let store = Store::new();
        assert!(hooks.run(&store).is_ok());
        assert_eq!(*order.lock().unwrap(), vec!["set", "check"]);
    }

    #[test]
    fn test_empty_hooks_succeed() {
        assert!(LoaderHooks::new().run(&Store::new()).is_ok());
    }
}
