//! Controller and middleware lookup tables.
//!
//! Routes name their controller and middlewares by string key. Both tables
//! are filled before the server starts and consulted once, by the route
//! compiler; resolution failures surface as typed errors there.

use crate::context::{RequestContext, SharedContext};
use crate::error::Result;
use crate::middleware::{named_fn, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// A controller: receives the request context, writes the response
///
/// Returning `Err` forwards the failure to the error translator.
pub type ControllerFn =
    Arc<dyn for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Wrap a function as a [`ControllerFn`]
pub fn controller<F>(f: F) -> ControllerFn
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Controllers by key
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, ControllerFn>,
}

impl ControllerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller under `key`, replacing any previous one
    pub fn insert<F>(&mut self, key: impl Into<String>, controller: F)
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.controllers.insert(key.into(), Arc::new(controller));
    }

    /// Builder form of [`ControllerRegistry::insert`]
    #[must_use]
    pub fn with<F>(mut self, key: impl Into<String>, controller: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.insert(key, controller);
        self
    }

    /// Look up a controller
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ControllerFn> {
        self.controllers.get(key).cloned()
    }

    /// Check if a controller exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.controllers.contains_key(key)
    }

    /// Number of registered controllers
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.controllers.keys().collect();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}

/// Named middlewares
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    middlewares: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware under `key`
    pub fn insert<M: Middleware + 'static>(&mut self, key: impl Into<String>, middleware: M) {
        self.middlewares.insert(key.into(), Arc::new(middleware));
    }

    /// Register a function middleware under `key`; the key doubles as its log name
    pub fn insert_fn<F>(&mut self, key: impl Into<String>, f: F)
    where
        F: for<'a> Fn(&'a SharedContext, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Next>>
            + Send
            + Sync
            + 'static,
    {
        let key = key.into();
        self.middlewares
            .insert(key.clone(), Arc::new(named_fn(key, f)));
    }

    /// Builder form of [`MiddlewareRegistry::insert_fn`]
    #[must_use]
    pub fn with_fn<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a SharedContext, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Next>>
            + Send
            + Sync
            + 'static,
    {
        self.insert_fn(key, f);
        self
    }

    /// Look up a middleware
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Middleware>> {
        self.middlewares.get(key).cloned()
    }

    /// Check if a middleware exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.middlewares.contains_key(key)
    }

    /// Number of registered middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.middlewares.keys().collect();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}
