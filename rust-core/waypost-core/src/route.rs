//! # Compiled Routes
//!
//! One entry of the compiled route table: the resolved path, its `matchit`
//! pattern, the resolved controller (if any) and the bound middleware chain.
//!
//! Route paths use Express-style parameters:
//!
//! - `/users/:id` captures one segment as `id`
//! - `/files/*path` (or a bare `*`) captures the rest of the path, which may
//!   be empty, so `/files/` matches with `path` set to `""`
//! - braces are literal, so an unsubstituted `{api_version}` only matches
//!   itself
//!
//! The `matchit` pattern names its captures by position (`{p0}`, `{p1}`,
//! ...). Two routes that differ only in parameter names therefore compile to
//! the same pattern, and captures are mapped back to each route's own names
//! at lookup time.

use crate::error::{Error, Result};
use crate::middleware::MiddlewareChain;
use crate::registry::ControllerFn;
use crate::router::RouteMethod;

/// Placeholder replaced with the configured API version
pub const API_VERSION_PLACEHOLDER: &str = "{api_version}";

/// Name given to a bare `*` wildcard
pub const WILDCARD_PARAM: &str = "wildcard";

/// Substitute the API version into a path template
///
/// Only the first occurrence is replaced. Without a version the template is
/// returned unchanged, placeholder included.
#[must_use]
pub fn resolve_path(template: &str, api_version: Option<&str>) -> String {
    match api_version {
        Some(version) => template.replacen(API_VERSION_PLACEHOLDER, version, 1),
        None => template.to_string(),
    }
}

/// A route ready for dispatch
#[derive(Clone)]
pub struct CompiledRoute {
    /// Method the route answers
    pub method: RouteMethod,
    /// Path after placeholder substitution
    pub path: String,
    /// Pattern handed to `matchit`, with positional capture names
    pub match_pattern: String,
    /// Names of captured parameters, in path order
    pub param_names: Vec<String>,
    /// Controller key as configured
    pub controller_key: String,
    controller: Option<ControllerFn>,
    /// Route-level middlewares, in execution order
    pub middlewares: MiddlewareChain,
}

impl CompiledRoute {
    /// Build a compiled route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for an empty parameter name or a
    /// wildcard that is not the last segment.
    pub fn new(
        method: RouteMethod,
        path: impl Into<String>,
        controller_key: impl Into<String>,
        controller: Option<ControllerFn>,
        middlewares: MiddlewareChain,
    ) -> Result<Self> {
        let path = path.into();
        let (match_pattern, param_names) = to_match_pattern(&path)?;
        Ok(Self {
            method,
            path,
            match_pattern,
            param_names,
            controller_key: controller_key.into(),
            controller,
            middlewares,
        })
    }

    /// The resolved controller, `None` if the key was not registered
    #[must_use]
    pub fn controller(&self) -> Option<&ControllerFn> {
        self.controller.as_ref()
    }

    /// `METHOD /path`, for logs and error messages
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

impl std::fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("match_pattern", &self.match_pattern)
            .field("controller_key", &self.controller_key)
            .field("resolved", &self.controller.is_some())
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

/// Capture name used in the `matchit` pattern for the parameter at `index`
#[must_use]
pub fn positional_param(index: usize) -> String {
    format!("p{index}")
}

/// Translate an Express-style path into a `matchit` pattern
///
/// Returns the pattern and the captured parameter names.
fn to_match_pattern(path: &str) -> Result<(String, Vec<String>)> {
    let invalid = |reason: &str| Error::InvalidRoutePattern {
        pattern: path.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').collect();
    let mut pattern = String::with_capacity(path.len() + 8);
    let mut names = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        pattern.push('/');

        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            pattern.push('{');
            pattern.push_str(&positional_param(names.len()));
            pattern.push('}');
            names.push(name.to_string());
        } else if let Some(name) = segment.strip_prefix('*') {
            if i + 1 != segments.len() {
                return Err(invalid("wildcard must be the last segment"));
            }
            let name = if name.is_empty() { WILDCARD_PARAM } else { name };
            pattern.push_str("{*");
            pattern.push_str(&positional_param(names.len()));
            pattern.push('}');
            names.push(name.to_string());
        } else {
            for c in segment.chars() {
                match c {
                    '{' => pattern.push_str("{{"),
                    '}' => pattern.push_str("}}"),
                    c => pattern.push(c),
                }
            }
        }
    }

    Ok((pattern, names))
}
