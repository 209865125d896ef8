//! # Middleware System
//!
//! Request/response interception.
//!
//! A middleware receives the `SharedContext` as an explicit argument along
//! with the request and response. It either lets the request continue down
//! the chain, halts the chain (the response it wrote is final), or fails.
//! A failure skips every later middleware and the controller and goes
//! straight to the error translator.
//!
//! Any closure or fn with the right shape is a middleware via [`from_fn`]:
//!
//! ```ignore
//! let auth = from_fn(|_shared, req, _res| {
//!     async move {
//!         if req.header("authorization").is_none() {
//!             return Err(Error::handler("unauthorized"));
//!         }
//!         Ok(Next::Continue)
//!     }
//!     .boxed()
//! });
//! ```

use crate::context::SharedContext;
use crate::dispatcher::guard;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info};

/// What the chain does after a middleware returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Continue to the next middleware/controller
    Continue,
    /// Stop here; the response is final
    Halt,
}

/// Middleware trait for request/response interception
///
/// `handle` runs in chain order before the controller; `after_response`
/// runs in reverse order on the final response, including error responses.
pub trait Middleware: Send + Sync {
    /// Called before the controller
    fn handle<'a>(
        &'a self,
        _shared: &'a SharedContext,
        _req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        async { Ok(Next::Continue) }.boxed()
    }

    /// Called on the final response
    fn after_response(&self, _req: &Request, _res: &mut Response) {}

    /// Middleware name for logging
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Middleware built from a closure or fn, see [`from_fn`]
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a SharedContext, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Next>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        shared: &'a SharedContext,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        (self.f)(shared, req, res)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a function as a middleware
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a SharedContext, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Next>>
        + Send
        + Sync,
{
    named_fn("anonymous", f)
}

/// Wrap a function as a middleware with a name used in logs
pub fn named_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a SharedContext, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Next>>
        + Send
        + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

/// Ordered middleware chain
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add an already shared middleware
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Run `handle` for every middleware in order
    ///
    /// Stops at the first `Halt` or failure. Panics inside a middleware are
    /// turned into `Error::Panic`.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised by a middleware.
    pub async fn run(
        &self,
        shared: &SharedContext,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<Next> {
        for mw in &self.middlewares {
            if guard(mw.handle(shared, req, res)).await? == Next::Halt {
                debug!(middleware = mw.name(), path = %req.path, "Chain halted");
                return Ok(Next::Halt);
            }
        }
        Ok(Next::Continue)
    }

    /// Execute `after_response` for all middlewares (in reverse order)
    pub fn run_after(&self, req: &Request, res: &mut Response) {
        for mw in self.middlewares.iter().rev() {
            mw.after_response(req, res);
        }
    }

    /// Middleware names, in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.middlewares.iter().map(|m| m.name().to_string()).collect()
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Logging middleware - one line when a request arrives, one when it leaves
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn handle<'a>(
        &'a self,
        _shared: &'a SharedContext,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        info!(method = %req.method, path = %req.path, "Request received");
        async { Ok(Next::Continue) }.boxed()
    }

    fn after_response(&self, req: &Request, res: &mut Response) {
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status,
            "Response sent"
        );
    }

    fn name(&self) -> &str {
        "LoggingMiddleware"
    }
}

/// CORS middleware - adds Cross-Origin Resource Sharing headers
///
/// Defaults are permissive: any origin, the common methods.
#[derive(Clone)]
pub struct CorsMiddleware {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET,HEAD,PUT,PATCH,POST,DELETE".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

impl CorsMiddleware {
    /// Create a new CORS middleware with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set allowed origin
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Set allowed methods
    #[must_use]
    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.allow_methods = methods.into();
        self
    }

    /// Set allowed headers
    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    /// Get the Access-Control-Allow-Origin header value
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.allow_origin
    }
}

impl Middleware for CorsMiddleware {
    /// Answers preflight requests directly
    fn handle<'a>(
        &'a self,
        _shared: &'a SharedContext,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        let preflight = req.method == hyper::Method::OPTIONS;
        async move {
            if preflight {
                res.status(204);
                return Ok(Next::Halt);
            }
            Ok(Next::Continue)
        }
        .boxed()
    }

    fn after_response(&self, _req: &Request, res: &mut Response) {
        res.set_header("Access-Control-Allow-Origin", &self.allow_origin);
        res.set_header("Access-Control-Allow-Methods", &self.allow_methods);
        res.set_header("Access-Control-Allow-Headers", &self.allow_headers);
    }

    fn name(&self) -> &str {
        "CorsMiddleware"
    }
}
