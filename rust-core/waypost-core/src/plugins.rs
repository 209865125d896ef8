//! # Plugins
//!
//! String-keyed, type-erased storage for values shared with every controller
//! and middleware (database pools, clients, feature flags...).
//!
//! Plugins are filled while the server is configured and frozen into the
//! `SharedContext` at start. After that they are only read, so no lock is
//! involved.

use std::any::Any;
use std::collections::HashMap;

/// Type-erased plugin container
///
/// # Example
///
/// ```ignore
/// let mut plugins = Plugins::new();
/// plugins.insert("greeting", "hello".to_string());
/// let greeting = plugins.get::<String>("greeting");
/// ```
#[derive(Default)]
pub struct Plugins {
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Plugins {
    /// Create an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Builder form of [`Plugins::insert`]
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Borrow a value by key
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of stored plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the container is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Plugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.data.keys().collect();
        keys.sort();
        f.debug_struct("Plugins").field("keys", &keys).finish()
    }
}
