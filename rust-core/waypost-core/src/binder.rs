//! # Context Binder
//!
//! Builds the `SharedContext` and resolves the middleware references of a
//! route into concrete middlewares.
//!
//! A reference is either a key into the middleware registry or a middleware
//! given directly. Keys are checked here, at startup: an unknown key fails
//! the whole registration instead of blowing up on the first request.
//! Binding never runs a middleware.

use crate::config::Settings;
use crate::context::SharedContext;
use crate::error::{Error, Result};
use crate::helpers::Helpers;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::plugins::Plugins;
use crate::registry::MiddlewareRegistry;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// Build the process-wide shared context
#[must_use]
pub fn build_shared(plugins: Plugins, helpers: Helpers, config: Settings) -> Arc<SharedContext> {
    Arc::new(SharedContext::new(plugins, helpers, config))
}

/// A middleware reference in a route spec
#[derive(Clone)]
pub enum MiddlewareRef {
    /// Key into the middleware registry
    Named(String),
    /// Middleware given directly
    Direct(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// Reference a middleware directly
    pub fn direct<M: Middleware + 'static>(middleware: M) -> Self {
        Self::Direct(Arc::new(middleware))
    }

    /// Label used in logs
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Named(key) => key,
            Self::Direct(mw) => mw.name(),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(key: &str) -> Self {
        Self::Named(key.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(key: String) -> Self {
        Self::Named(key)
    }
}

impl std::fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(key) => f.debug_tuple("Named").field(key).finish(),
            Self::Direct(mw) => f.debug_tuple("Direct").field(&mw.name()).finish(),
        }
    }
}

/// Declarative route files can only name middlewares
impl<'de> Deserialize<'de> for MiddlewareRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Named)
    }
}

/// Resolves middleware references against the registry
#[derive(Debug, Clone, Copy)]
pub struct ContextBinder<'a> {
    registry: &'a MiddlewareRegistry,
}

impl<'a> ContextBinder<'a> {
    /// Bind against `registry`
    #[must_use]
    pub const fn new(registry: &'a MiddlewareRegistry) -> Self {
        Self { registry }
    }

    /// Resolve one reference
    ///
    /// `route` only feeds the error message.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingMiddleware` if a key is not registered.
    pub fn bind(&self, reference: &MiddlewareRef, route: &str) -> Result<Arc<dyn Middleware>> {
        match reference {
            MiddlewareRef::Direct(mw) => Ok(Arc::clone(mw)),
            MiddlewareRef::Named(key) => {
                self.registry
                    .get(key)
                    .ok_or_else(|| Error::MissingMiddleware {
                        key: key.clone(),
                        route: route.to_string(),
                    })
            }
        }
    }

    /// Resolve a route's references into a chain, order preserved
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingMiddleware` for the first unknown key.
    pub fn bind_chain(&self, references: &[MiddlewareRef], route: &str) -> Result<MiddlewareChain> {
        let mut chain = MiddlewareChain::new();
        for reference in references {
            chain.push(self.bind(reference, route)?);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{named_fn, Next};
    use futures::FutureExt;

    fn registry() -> MiddlewareRegistry {
        MiddlewareRegistry::new()
            .with_fn("auth", |_shared, _req, _res| async { Ok(Next::Continue) }.boxed())
            .with_fn("audit", |_shared, _req, _res| async { Ok(Next::Continue) }.boxed())
    }

    #[test]
    fn test_bind_chain_preserves_order() {
        let registry = registry();
        let binder = ContextBinder::new(&registry);
        let refs = vec![
            MiddlewareRef::from("audit"),
            MiddlewareRef::direct(named_fn("inline", |_shared, _req, _res| {
                async { Ok(Next::Continue) }.boxed()
            })),
            MiddlewareRef::from("auth"),
        ];

        let chain = binder.bind_chain(&refs, "GET /").unwrap();
        assert_eq!(chain.names(), vec!["audit", "inline", "auth"]);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let registry = registry();
        let binder = ContextBinder::new(&registry);
        let refs = vec![MiddlewareRef::from("auth"), MiddlewareRef::from("admin")];

        let err = binder.bind_chain(&refs, "GET /admin").unwrap_err();
        match err {
            Error::MissingMiddleware { key, route } => {
                assert_eq!(key, "admin");
                assert_eq!(route, "GET /admin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deserialize_named_reference() {
        let refs: Vec<MiddlewareRef> = serde_json::from_str(r#"["auth", "audit"]"#).unwrap();
        let labels: Vec<_> = refs.iter().map(MiddlewareRef::label).collect();
        assert_eq!(labels, vec!["auth", "audit"]);
    }

    #[test]
    fn test_build_shared() {
        let shared = build_shared(
            Plugins::new(),
            Helpers::new(),
            Settings::new().with_api_version("v3"),
        );
        assert_eq!(shared.config().api_version(), Some("v3"));
    }
}
