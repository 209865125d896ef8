//! Shared and per-request context.
//!
//! `SharedContext` is built once when the server starts and handed by
//! reference to every middleware call and, through `RequestContext`, to every
//! controller call. `RequestContext` is created per request and dropped when
//! the response is produced.

use crate::config::Settings;
use crate::helpers::Helpers;
use crate::plugins::Plugins;
use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;

/// Process-wide, read-only bundle of plugins, helpers and settings
#[derive(Debug, Default)]
pub struct SharedContext {
    plugins: Plugins,
    helpers: Helpers,
    config: Settings,
}

impl SharedContext {
    /// Assemble the shared context
    #[must_use]
    pub const fn new(plugins: Plugins, helpers: Helpers, config: Settings) -> Self {
        Self {
            plugins,
            helpers,
            config,
        }
    }

    /// Plugins
    #[must_use]
    pub const fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// Helper functions
    #[must_use]
    pub const fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Settings object
    #[must_use]
    pub const fn config(&self) -> &Settings {
        &self.config
    }
}

/// Everything a controller receives for one request
#[derive(Debug)]
pub struct RequestContext {
    /// The incoming request
    pub request: Request,
    /// The response being built
    pub response: Response,
    shared: Arc<SharedContext>,
}

impl RequestContext {
    /// Start a fresh context for `request`
    #[must_use]
    pub fn new(request: Request, shared: Arc<SharedContext>) -> Self {
        Self {
            request,
            response: Response::new(),
            shared,
        }
    }

    /// The shared context
    #[must_use]
    pub fn shared(&self) -> &SharedContext {
        &self.shared
    }

    /// Plugins
    #[must_use]
    pub fn plugins(&self) -> &Plugins {
        self.shared.plugins()
    }

    /// Helper functions
    #[must_use]
    pub fn helpers(&self) -> &Helpers {
        self.shared.helpers()
    }

    /// Settings object
    #[must_use]
    pub fn config(&self) -> &Settings {
        self.shared.config()
    }

    /// Borrow the shared context, request and response at once
    ///
    /// This is the shape middlewares are called with.
    pub fn split(&mut self) -> (&SharedContext, &mut Request, &mut Response) {
        (&self.shared, &mut self.request, &mut self.response)
    }

    /// Consume the context, keeping the response
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Consume the context, keeping request and response
    #[must_use]
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
