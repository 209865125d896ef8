//! # Compiled Route Table
//!
//! Built once at startup and read-only afterwards, so it is shared across
//! connections without locking.
//!
//! Routes are tried in registration order and the first one whose method
//! and path both match wins, whatever the specificity of later patterns.
//! Each distinct path pattern is compiled once into its own `matchit`
//! matcher; routes that share a pattern (say `GET /users/:id` and
//! `DELETE /users/:userId`) share the matcher.

use crate::error::{Error, Result};
use crate::route::{positional_param, CompiledRoute};
use hyper::Method;
use matchit::{InsertError, Router as MatchitRouter};
use std::collections::HashMap;

/// HTTP methods a route can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// HTTP GET (also answers HEAD)
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// Any method
    All,
}

impl RouteMethod {
    /// Parse a configured method name, case-insensitively
    ///
    /// A missing or empty method means `All`. Returns `None` for anything
    /// outside GET, POST, PUT, DELETE and ALL, including names padded with
    /// whitespace.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("" | "all") => Some(Self::All),
            Some("get") => Some(Self::Get),
            Some("post") => Some(Self::Post),
            Some("put") => Some(Self::Put),
            Some("delete") => Some(Self::Delete),
            Some(_) => None,
        }
    }

    /// Whether a request with `method` may be handled by this route
    #[must_use]
    pub fn accepts(self, method: &Method) -> bool {
        match self {
            Self::All => true,
            Self::Get => *method == Method::GET || *method == Method::HEAD,
            Self::Post => *method == Method::POST,
            Self::Put => *method == Method::PUT,
            Self::Delete => *method == Method::DELETE,
        }
    }
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::All => write!(f, "ALL"),
        }
    }
}

/// Matched route with extracted path parameters
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The route that will handle the request
    pub route: &'a CompiledRoute,
    /// Extracted path parameters, under the route's own names
    pub params: HashMap<String, String>,
}

/// The compiled route table
pub struct RouteTable {
    /// One matcher per distinct pattern
    matchers: Vec<MatchitRouter<()>>,
    /// Pattern to matcher index
    patterns: HashMap<String, usize>,
    /// Matcher index of each route, parallel to `routes`
    route_matchers: Vec<usize>,
    routes: Vec<CompiledRoute>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            patterns: HashMap::new(),
            route_matchers: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Append a route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if `matchit` rejects the pattern.
    pub fn insert(&mut self, route: CompiledRoute) -> Result<()> {
        let index = if let Some(&index) = self.patterns.get(&route.match_pattern) {
            index
        } else {
            let matcher = build_matcher(&route).map_err(|e| Error::InvalidRoutePattern {
                pattern: route.path.clone(),
                reason: e.to_string(),
            })?;
            self.matchers.push(matcher);
            self.patterns
                .insert(route.match_pattern.clone(), self.matchers.len() - 1);
            self.matchers.len() - 1
        };

        self.route_matchers.push(index);
        self.routes.push(route);
        Ok(())
    }

    /// Find the route for a request
    ///
    /// Each route also accepts the path with one trailing slash removed,
    /// before the next route is tried.
    #[must_use]
    pub fn lookup<'a>(&'a self, method: &Method, path: &str) -> Option<RouteMatch<'a>> {
        let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty());

        self.routes
            .iter()
            .zip(&self.route_matchers)
            .filter(|(route, _)| route.method.accepts(method))
            .find_map(|(route, &index)| {
                let matcher = &self.matchers[index];
                let matched = matcher
                    .at(path)
                    .ok()
                    .or_else(|| matcher.at(trimmed?).ok())?;

                let params = route
                    .param_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let value = matched.params.get(positional_param(i)).unwrap_or_default();
                        (name.clone(), value.to_string())
                    })
                    .collect();

                Some(RouteMatch { route, params })
            })
    }

    /// Compiled routes, in registration order
    pub fn routes(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.routes.iter()
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.iter()).finish()
    }
}

/// Matcher for one route's pattern
///
/// A trailing wildcard also matches an empty tail, so `/files/{*p0}` is
/// registered together with `/files/`.
fn build_matcher(route: &CompiledRoute) -> std::result::Result<MatchitRouter<()>, InsertError> {
    let mut matcher = MatchitRouter::new();
    matcher.insert(route.match_pattern.clone(), ())?;

    if let Some(last) = route.param_names.len().checked_sub(1) {
        let tail = format!("{{*{}}}", positional_param(last));
        if let Some(prefix) = route.match_pattern.strip_suffix(&tail) {
            matcher.insert(prefix, ())?;
        }
    }

    Ok(matcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareChain;

    fn route(method: RouteMethod, path: &str, key: &str) -> CompiledRoute {
        CompiledRoute::new(method, path, key, None, MiddlewareChain::new()).unwrap()
    }

    fn table(routes: &[(RouteMethod, &str, &str)]) -> RouteTable {
        let mut table = RouteTable::new();
        for (method, path, key) in routes {
            table.insert(route(*method, path, key)).unwrap();
        }
        table
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(RouteMethod::parse(None), Some(RouteMethod::All));
        assert_eq!(RouteMethod::parse(Some("GET")), Some(RouteMethod::Get));
        assert_eq!(RouteMethod::parse(Some("Delete")), Some(RouteMethod::Delete));
        assert_eq!(RouteMethod::parse(Some("all")), Some(RouteMethod::All));
        assert_eq!(RouteMethod::parse(Some("")), Some(RouteMethod::All));
        assert_eq!(RouteMethod::parse(Some("GET ")), None);
        assert_eq!(RouteMethod::parse(Some(" ")), None);
        assert_eq!(RouteMethod::parse(Some("PATCH")), None);
        assert_eq!(RouteMethod::parse(Some("options")), None);
    }

    #[test]
    fn test_basic_routing() {
        let table = table(&[
            (RouteMethod::Get, "/", "Home"),
            (RouteMethod::Get, "/users", "ListUsers"),
            (RouteMethod::Post, "/users", "CreateUser"),
        ]);

        let m = table.lookup(&Method::GET, "/").unwrap();
        assert_eq!(m.route.controller_key, "Home");

        let m = table.lookup(&Method::GET, "/users").unwrap();
        assert_eq!(m.route.controller_key, "ListUsers");

        let m = table.lookup(&Method::POST, "/users").unwrap();
        assert_eq!(m.route.controller_key, "CreateUser");
    }

    #[test]
    fn test_path_parameters() {
        let table = table(&[(RouteMethod::Get, "/users/:user_id/posts/:post_id", "Post")]);

        let m = table.lookup(&Method::GET, "/users/456/posts/789").unwrap();
        assert_eq!(m.params.get("user_id").map(String::as_str), Some("456"));
        assert_eq!(m.params.get("post_id").map(String::as_str), Some("789"));
    }

    #[test]
    fn test_first_registered_wins() {
        let table = table(&[
            (RouteMethod::All, "/ping", "First"),
            (RouteMethod::Get, "/ping", "Second"),
        ]);

        let m = table.lookup(&Method::GET, "/ping").unwrap();
        assert_eq!(m.route.controller_key, "First");
    }

    #[test]
    fn test_all_accepts_any_method() {
        let table = table(&[(RouteMethod::All, "/any", "Any")]);
        for method in [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS] {
            assert!(table.lookup(&method, "/any").is_some());
        }
    }

    #[test]
    fn test_head_uses_get_routes() {
        let table = table(&[(RouteMethod::Get, "/", "Home")]);
        assert!(table.lookup(&Method::HEAD, "/").is_some());
    }

    #[test]
    fn test_method_not_allowed_is_a_miss() {
        let table = table(&[(RouteMethod::Get, "/users", "ListUsers")]);
        assert!(table.lookup(&Method::POST, "/users").is_none());
    }

    #[test]
    fn test_route_not_found() {
        let table = RouteTable::new();
        assert!(table.lookup(&Method::GET, "/nonexistent").is_none());
    }

    #[test]
    fn test_trailing_slash_fallback() {
        let table = table(&[(RouteMethod::Get, "/users", "ListUsers")]);
        assert!(table.lookup(&Method::GET, "/users/").is_some());
    }

    #[test]
    fn test_literal_placeholder_segment() {
        let table = table(&[(RouteMethod::Get, "/api/{api_version}/users", "Users")]);

        assert!(table.lookup(&Method::GET, "/api/{api_version}/users").is_some());
        assert!(table.lookup(&Method::GET, "/api/v2/users").is_none());
    }

    #[test]
    fn test_methods_share_a_path_with_different_param_names() {
        let table = table(&[
            (RouteMethod::Get, "/users/:id", "ShowUser"),
            (RouteMethod::Delete, "/users/:userId", "DeleteUser"),
        ]);

        let m = table.lookup(&Method::GET, "/users/7").unwrap();
        assert_eq!(m.route.controller_key, "ShowUser");
        assert_eq!(m.params.get("id").map(String::as_str), Some("7"));

        let m = table.lookup(&Method::DELETE, "/users/7").unwrap();
        assert_eq!(m.route.controller_key, "DeleteUser");
        assert_eq!(m.params.get("userId").map(String::as_str), Some("7"));
        assert!(!m.params.contains_key("id"));
    }

    #[test]
    fn test_registration_order_beats_specificity() {
        let param_first = table(&[
            (RouteMethod::Get, "/users/:id", "ById"),
            (RouteMethod::Get, "/users/me", "Me"),
        ]);
        let m = param_first.lookup(&Method::GET, "/users/me").unwrap();
        assert_eq!(m.route.controller_key, "ById");
        assert_eq!(m.params.get("id").map(String::as_str), Some("me"));

        let static_first = table(&[
            (RouteMethod::Get, "/users/me", "Me"),
            (RouteMethod::Get, "/users/:id", "ById"),
        ]);
        let m = static_first.lookup(&Method::GET, "/users/me").unwrap();
        assert_eq!(m.route.controller_key, "Me");
        let m = static_first.lookup(&Method::GET, "/users/42").unwrap();
        assert_eq!(m.route.controller_key, "ById");
    }

    #[test]
    fn test_catch_all_registered_first_shadows_later_routes() {
        let table = table(&[
            (RouteMethod::All, "/*", "Everything"),
            (RouteMethod::Get, "/users", "ListUsers"),
        ]);
        let m = table.lookup(&Method::GET, "/users").unwrap();
        assert_eq!(m.route.controller_key, "Everything");
        assert_eq!(m.params.get("wildcard").map(String::as_str), Some("users"));
    }

    #[test]
    fn test_wildcard_matches_empty_tail() {
        let table = table(&[
            (RouteMethod::Get, "/files/*", "Files"),
            (RouteMethod::Get, "/docs/*rest", "Docs"),
        ]);

        let m = table.lookup(&Method::GET, "/files/").unwrap();
        assert_eq!(m.params.get("wildcard").map(String::as_str), Some(""));

        let m = table.lookup(&Method::GET, "/files/a/b.txt").unwrap();
        assert_eq!(m.params.get("wildcard").map(String::as_str), Some("a/b.txt"));

        let m = table.lookup(&Method::GET, "/docs/").unwrap();
        assert_eq!(m.route.controller_key, "Docs");
        assert_eq!(m.params.get("rest").map(String::as_str), Some(""));

        assert!(table.lookup(&Method::GET, "/files").is_none());
    }

    #[test]
    fn test_trailing_slash_keeps_registration_order() {
        let table = table(&[
            (RouteMethod::Get, "/users", "ListUsers"),
            (RouteMethod::Get, "/users/*", "UserFiles"),
        ]);
        let m = table.lookup(&Method::GET, "/users/").unwrap();
        assert_eq!(m.route.controller_key, "ListUsers");
    }
}
