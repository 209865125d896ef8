//! # Route Compiler
//!
//! Turns the configured route specs into the compiled route table, once, at
//! startup. For each route, in input order:
//!
//! 1. substitute `{api_version}` in the path (when a version is configured)
//! 2. normalize the method, defaulting to ALL
//! 3. skip, with a warning, methods outside GET/POST/PUT/DELETE/ALL
//! 4. resolve the controller; a missing one is kept as `None` and fails
//!    per request instead of failing startup
//! 5. bind the middleware chain (unknown keys fail startup)
//! 6. append the route to the table

use crate::binder::{ContextBinder, MiddlewareRef};
use crate::config::Settings;
use crate::error::Result;
use crate::json::parse_json;
use crate::registry::{ControllerRegistry, MiddlewareRegistry};
use crate::route::{resolve_path, CompiledRoute};
use crate::router::{RouteMethod, RouteTable};
use serde::Deserialize;
use tracing::{info, warn};

/// Declarative description of one route
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    /// Path template, may contain `{api_version}`
    pub path: String,
    /// Method name; `None` means ALL
    #[serde(default)]
    pub method: Option<String>,
    /// Controller key
    pub controller: String,
    /// Middlewares, run in order before the controller
    #[serde(default)]
    pub middlewares: Vec<MiddlewareRef>,
}

impl RouteSpec {
    /// Route with an explicit method name
    pub fn new(method: impl Into<String>, path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Some(method.into()),
            controller: controller.into(),
            middlewares: Vec::new(),
        }
    }

    /// GET route
    pub fn get(path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self::new("GET", path, controller)
    }

    /// POST route
    pub fn post(path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self::new("POST", path, controller)
    }

    /// PUT route
    pub fn put(path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self::new("PUT", path, controller)
    }

    /// DELETE route
    pub fn delete(path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self::new("DELETE", path, controller)
    }

    /// Route for any method
    pub fn all(path: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: None,
            controller: controller.into(),
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware reference
    #[must_use]
    pub fn middleware(mut self, reference: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(reference.into());
        self
    }

    /// Load a list of route specs from a JSON array
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidJson` for malformed input
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        parse_json(json)
    }
}

/// Compiles route specs against the registries and settings
#[derive(Debug, Clone, Copy)]
pub struct RouteCompiler<'a> {
    controllers: &'a ControllerRegistry,
    binder: ContextBinder<'a>,
    settings: &'a Settings,
}

impl<'a> RouteCompiler<'a> {
    /// Create a compiler
    #[must_use]
    pub const fn new(
        controllers: &'a ControllerRegistry,
        middlewares: &'a MiddlewareRegistry,
        settings: &'a Settings,
    ) -> Self {
        Self {
            controllers,
            binder: ContextBinder::new(middlewares),
            settings,
        }
    }

    /// Compile `specs` into a route table
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingMiddleware` if a route names an unknown
    /// middleware. Routes with an unsupported method or a path that cannot
    /// be matched (an empty `:` parameter, a wildcard before the last
    /// segment) are logged and left out.
    pub fn compile(&self, specs: &[RouteSpec]) -> Result<RouteTable> {
        let mut table = RouteTable::new();

        for spec in specs {
            let path = resolve_path(&spec.path, self.settings.api_version());

            let Some(method) = RouteMethod::parse(spec.method.as_deref()) else {
                warn!(
                    method = spec.method.as_deref().unwrap_or_default(),
                    path = %path,
                    controller = %spec.controller,
                    "Skipping route with unsupported method"
                );
                continue;
            };

            let controller = self.controllers.get(&spec.controller);
            if controller.is_none() {
                warn!(
                    method = %method,
                    path = %path,
                    controller = %spec.controller,
                    "Controller not registered; requests to this route will fail"
                );
            }

            let route_desc = format!("{method} {path}");
            let chain = self.binder.bind_chain(&spec.middlewares, &route_desc)?;

            let middleware_names = chain.names();
            let compiled = CompiledRoute::new(method, path.clone(), spec.controller.clone(), controller, chain)
                .and_then(|route| table.insert(route));
            if let Err(e) = compiled {
                warn!(
                    method = %method,
                    path = %path,
                    controller = %spec.controller,
                    error = %e,
                    "Skipping route with unusable path"
                );
                continue;
            }

            info!(
                method = %method,
                path = %path,
                controller = %spec.controller,
                middlewares = ?middleware_names,
                "Registering route"
            );
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::middleware::Next;
    use futures::FutureExt;
    use hyper::Method;

    fn controllers() -> ControllerRegistry {
        ControllerRegistry::new()
            .with("Home", |ctx| async move { ctx.response.send("ok") }.boxed())
            .with("Users", |ctx| async move { ctx.response.send("users") }.boxed())
    }

    fn middlewares() -> MiddlewareRegistry {
        MiddlewareRegistry::new()
            .with_fn("auth", |_shared, _req, _res| async { Ok(Next::Continue) }.boxed())
    }

    fn compile(specs: &[RouteSpec], settings: &Settings) -> Result<RouteTable> {
        let controllers = controllers();
        let middlewares = middlewares();
        RouteCompiler::new(&controllers, &middlewares, settings).compile(specs)
    }

    #[test]
    fn test_api_version_substitution() {
        let settings = Settings::new().with_api_version("v2");
        let table = compile(&[RouteSpec::get("/api/{api_version}/users", "Users")], &settings).unwrap();

        let route = table.routes().next().unwrap();
        assert_eq!(route.path, "/api/v2/users");
        assert!(table.lookup(&Method::GET, "/api/v2/users").is_some());
    }

    #[test]
    fn test_placeholder_kept_without_version() {
        let table = compile(&[RouteSpec::get("/api/{api_version}/users", "Users")], &Settings::new()).unwrap();

        let route = table.routes().next().unwrap();
        assert_eq!(route.path, "/api/{api_version}/users");
    }

    #[test]
    fn test_unsupported_methods_are_skipped() {
        let specs = vec![
            RouteSpec::new("PATCH", "/users", "Users"),
            RouteSpec::new("options", "/users", "Users"),
            RouteSpec::get("/users", "Users"),
        ];
        let table = compile(&specs, &Settings::new()).unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.lookup(&Method::PATCH, "/users").is_none());
    }

    #[test]
    fn test_empty_method_means_all() {
        let specs = vec![
            RouteSpec::new("", "/x", "Home"),
            RouteSpec::new("GET ", "/padded", "Home"),
        ];
        let table = compile(&specs, &Settings::new()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.routes().next().unwrap().method, RouteMethod::All);
        assert!(table.lookup(&Method::POST, "/x").is_some());
        assert!(table.lookup(&Method::GET, "/padded").is_none());
    }

    #[test]
    fn test_same_path_with_different_param_names_compiles() {
        let specs = vec![
            RouteSpec::get("/users/:id", "Users"),
            RouteSpec::new("DELETE", "/users/:userId", "Home"),
        ];
        let table = compile(&specs, &Settings::new()).unwrap();

        assert_eq!(table.len(), 2);
        let m = table.lookup(&Method::DELETE, "/users/9").unwrap();
        assert_eq!(m.route.controller_key, "Home");
        assert_eq!(m.params.get("userId").map(String::as_str), Some("9"));
    }

    #[test]
    fn test_unusable_paths_are_skipped() {
        let specs = vec![
            RouteSpec::get("/users/:", "Users"),
            RouteSpec::get("/a/*rest/b", "Users"),
            RouteSpec::get("/", "Home"),
        ];
        let table = compile(&specs, &Settings::new()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.routes().next().unwrap().controller_key, "Home");
    }

    #[test]
    fn test_method_defaults_to_all_and_is_case_insensitive() {
        let specs = vec![RouteSpec::all("/any", "Home"), RouteSpec::new("get", "/lower", "Home")];
        let table = compile(&specs, &Settings::new()).unwrap();

        let methods: Vec<_> = table.routes().map(|r| r.method).collect();
        assert_eq!(methods, vec![RouteMethod::All, RouteMethod::Get]);
    }

    #[test]
    fn test_missing_controller_is_deferred() {
        let table = compile(&[RouteSpec::get("/broken", "Nope")], &Settings::new()).unwrap();

        let route = table.routes().next().unwrap();
        assert!(route.controller().is_none());
        assert_eq!(route.controller_key, "Nope");
    }

    #[test]
    fn test_missing_middleware_fails_compilation() {
        let specs = vec![RouteSpec::get("/admin", "Home").middleware("auth").middleware("admin")];
        let err = compile(&specs, &Settings::new()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Middleware 'admin' is not registered (route GET /admin)"
        );
    }

    #[test]
    fn test_missing_middleware_on_skipped_route_is_ignored() {
        let specs = vec![RouteSpec::new("PATCH", "/admin", "Home").middleware("admin")];
        let table = compile(&specs, &Settings::new()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_routes_from_json() {
        let specs = RouteSpec::list_from_json(
            r#"[
                {"path": "/", "method": "GET", "middlewares": ["auth"], "controller": "Home"},
                {"path": "/users", "controller": "Users"}
            ]"#,
        )
        .unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].middlewares[0].label(), "auth");
        assert!(specs[1].method.is_none());

        let table = compile(&specs, &Settings::new()).unwrap();
        assert_eq!(table.routes().next().unwrap().middlewares.names(), vec!["auth"]);
    }

    #[test]
    fn test_malformed_routes_json() {
        assert!(matches!(
            RouteSpec::list_from_json("[{"),
            Err(Error::InvalidJson { .. })
        ));
    }
}
