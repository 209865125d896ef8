//! # Configuration Model
//!
//! In-memory description of everything the server is built from: routes,
//! controllers, named middlewares, global middlewares, static directories,
//! plugins, helpers and the top-level settings object.
//!
//! The model is plain data. It can be assembled with the `with_*` builders
//! or mutated one key at a time through [`AppConfig::set`] until the server
//! starts; `Server::start` consumes it, after which nothing can change.

use crate::compiler::RouteSpec;
use crate::error::{Error, Result};
use crate::helpers::Helpers;
use crate::json::parse_json;
use crate::middleware::Middleware;
use crate::plugins::Plugins;
use crate::registry::{ControllerRegistry, MiddlewareRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// The top-level settings object (`config` key)
///
/// `ApiVersion` drives `{api_version}` substitution in route paths. Any
/// other keys are kept verbatim in `extra` and exposed to handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// API version substituted into route paths
    #[serde(rename = "ApiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Remaining application settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Create empty settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API version
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Load settings from a JSON document
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidJson` for malformed input
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// Look up an extra setting
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// The API version, ignoring an empty string
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref().filter(|v| !v.is_empty())
    }
}

/// Keys accepted by [`AppConfig::set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Middlewares installed before routing, in order
    GlobalMiddlewares,
    /// Named middleware registry
    Middlewares,
    /// Route specifications
    Routes,
    /// Controller registry
    Controllers,
    /// Static asset directories
    Statics,
    /// Plugin container
    Plugins,
    /// Helper functions
    Helpers,
    /// Settings object
    Config,
}

impl ConfigKey {
    /// Canonical key name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GlobalMiddlewares => "globalMiddlewares",
            Self::Middlewares => "middlewares",
            Self::Routes => "routes",
            Self::Controllers => "controllers",
            Self::Statics => "statics",
            Self::Plugins => "plugins",
            Self::Helpers => "helpers",
            Self::Config => "config",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "globalMiddlewares" | "global_middlewares" => Ok(Self::GlobalMiddlewares),
            "middlewares" => Ok(Self::Middlewares),
            "routes" => Ok(Self::Routes),
            "controllers" => Ok(Self::Controllers),
            "statics" => Ok(Self::Statics),
            "plugins" => Ok(Self::Plugins),
            "helpers" => Ok(Self::Helpers),
            "config" | "settings" => Ok(Self::Config),
            other => Err(Error::UnknownConfigKey {
                key: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value half of [`AppConfig::set`]
pub enum ConfigValue {
    /// For `globalMiddlewares`
    GlobalMiddlewares(Vec<Arc<dyn Middleware>>),
    /// For `middlewares`
    Middlewares(MiddlewareRegistry),
    /// For `routes`
    Routes(Vec<RouteSpec>),
    /// For `controllers`
    Controllers(ControllerRegistry),
    /// For `statics`
    Statics(Vec<PathBuf>),
    /// For `plugins`
    Plugins(Plugins),
    /// For `helpers`
    Helpers(Helpers),
    /// For `config`
    Config(Settings),
}

impl ConfigValue {
    const fn expected(key: ConfigKey) -> &'static str {
        match key {
            ConfigKey::GlobalMiddlewares => "a list of middlewares",
            ConfigKey::Middlewares => "a middleware registry",
            ConfigKey::Routes => "a list of route specs",
            ConfigKey::Controllers => "a controller registry",
            ConfigKey::Statics => "a list of directories",
            ConfigKey::Plugins => "a plugin container",
            ConfigKey::Helpers => "a helper registry",
            ConfigKey::Config => "a settings object",
        }
    }
}

impl From<Settings> for ConfigValue {
    fn from(settings: Settings) -> Self {
        Self::Config(settings)
    }
}

impl From<Vec<RouteSpec>> for ConfigValue {
    fn from(routes: Vec<RouteSpec>) -> Self {
        Self::Routes(routes)
    }
}

impl From<ControllerRegistry> for ConfigValue {
    fn from(controllers: ControllerRegistry) -> Self {
        Self::Controllers(controllers)
    }
}

impl From<MiddlewareRegistry> for ConfigValue {
    fn from(middlewares: MiddlewareRegistry) -> Self {
        Self::Middlewares(middlewares)
    }
}

impl From<Plugins> for ConfigValue {
    fn from(plugins: Plugins) -> Self {
        Self::Plugins(plugins)
    }
}

impl From<Helpers> for ConfigValue {
    fn from(helpers: Helpers) -> Self {
        Self::Helpers(helpers)
    }
}

/// Complete server configuration
#[derive(Default)]
pub struct AppConfig {
    /// Installed before routing, in order
    pub global_middlewares: Vec<Arc<dyn Middleware>>,
    /// Named middlewares referenced by routes
    pub middlewares: MiddlewareRegistry,
    /// Route specifications, in registration order
    pub routes: Vec<RouteSpec>,
    /// Controllers referenced by routes
    pub controllers: ControllerRegistry,
    /// Static asset directories, searched in order
    pub statics: Vec<PathBuf>,
    /// Plugins shared with handlers
    pub plugins: Plugins,
    /// Helpers shared with handlers
    pub helpers: Helpers,
    /// Settings object
    pub settings: Settings,
}

impl AppConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the route list
    #[must_use]
    pub fn with_routes(mut self, routes: Vec<RouteSpec>) -> Self {
        self.routes = routes;
        self
    }

    /// Replace the controller registry
    #[must_use]
    pub fn with_controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    /// Replace the middleware registry
    #[must_use]
    pub fn with_middlewares(mut self, middlewares: MiddlewareRegistry) -> Self {
        self.middlewares = middlewares;
        self
    }

    /// Append a global middleware
    #[must_use]
    pub fn with_global_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.global_middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a static directory
    #[must_use]
    pub fn with_static(mut self, dir: impl Into<PathBuf>) -> Self {
        self.statics.push(dir.into());
        self
    }

    /// Replace the plugin container
    #[must_use]
    pub fn with_plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    /// Replace the helper registry
    #[must_use]
    pub fn with_helpers(mut self, helpers: Helpers) -> Self {
        self.helpers = helpers;
        self
    }

    /// Replace the settings object
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace one configuration entry by key
    ///
    /// An empty key is a no-op and leaves the configuration untouched.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownConfigKey` if `key` names no configuration entry
    /// - `Error::ConfigValueMismatch` if `value` does not fit `key`
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        let key: ConfigKey = key.parse()?;

        match (key, value.into()) {
            (ConfigKey::GlobalMiddlewares, ConfigValue::GlobalMiddlewares(v)) => {
                self.global_middlewares = v;
            }
            (ConfigKey::Middlewares, ConfigValue::Middlewares(v)) => self.middlewares = v,
            (ConfigKey::Routes, ConfigValue::Routes(v)) => self.routes = v,
            (ConfigKey::Controllers, ConfigValue::Controllers(v)) => self.controllers = v,
            (ConfigKey::Statics, ConfigValue::Statics(v)) => self.statics = v,
            (ConfigKey::Plugins, ConfigValue::Plugins(v)) => self.plugins = v,
            (ConfigKey::Helpers, ConfigValue::Helpers(v)) => self.helpers = v,
            (ConfigKey::Config, ConfigValue::Config(v)) => self.settings = v,
            (key, _) => {
                return Err(Error::ConfigValueMismatch {
                    key: key.to_string(),
                    expected: ConfigValue::expected(key),
                })
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("global_middlewares", &self.global_middlewares.len())
            .field("middlewares", &self.middlewares)
            .field("routes", &self.routes)
            .field("controllers", &self.controllers)
            .field("statics", &self.statics)
            .field("plugins", &self.plugins)
            .field("helpers", &self.helpers)
            .field("settings", &self.settings)
            .finish()
    }
}
