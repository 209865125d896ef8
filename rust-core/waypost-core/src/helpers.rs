//! Named helper functions shared through the `SharedContext`.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A helper takes positional JSON arguments and returns a JSON value
pub type HelperFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Registry of helper functions
#[derive(Clone, Default)]
pub struct Helpers {
    functions: HashMap<String, HelperFn>,
}

impl Helpers {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a helper under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Builder form of [`Helpers::register`]
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    /// Call a helper by name
    ///
    /// # Errors
    ///
    /// Fails if no helper is registered under `name`, or with whatever the
    /// helper itself returns.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let helper = self
            .functions
            .get(name)
            .ok_or_else(|| Error::handler(format!("Unknown helper: {name}")))?;
        helper(args)
    }

    /// Check if a helper exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered helpers
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for Helpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Helpers").field("names", &names).finish()
    }
}
