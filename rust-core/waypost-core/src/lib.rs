//! # Waypost Core
//!
//! Declarative HTTP route registration on Hyper and Tokio.
//!
//! A server is described by data: route specs naming a controller and
//! middlewares by key, registries holding the controllers and middlewares,
//! and a shared context of plugins, helpers and settings. At startup the
//! routes are compiled once into a read-only table; every request is then
//! dispatched through its route's middleware chain and controller, with any
//! failure turned into a single 500 JSON response.
//!
//! ## Modules
//!
//! - `config` - Configuration model and keyed setter
//! - `binder` - Shared context construction, middleware resolution
//! - `compiler` - Route specs to compiled route table
//! - `router` - Compiled route table, first registered match wins
//! - `route` - Compiled routes, path templates
//! - `dispatcher` - Per-request controller invocation, panic boundary
//! - `translator` - Failure to 500 JSON response
//! - `server` - Lifecycle, request pipeline, Hyper serve loop
//! - `middleware` - Middleware trait, chains, CORS and logging
//! - `body` - JSON and urlencoded body parsers
//! - `compression` - gzip response compression
//! - `statics` - Static file fallback
//! - `request` / `response` - Per-request I/O types
//! - `context` - Shared and per-request context
//! - `registry` - Controller and middleware registries
//! - `plugins` / `helpers` - Shared context contents
//! - `json` - JSON parsing with simd-json
//! - `logging` - Tracing subscriber setup
//! - `error` - Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use waypost_core::{
//!     AppConfig, ControllerRegistry, FutureExt, ListenConfig, MiddlewareRegistry, Next,
//!     RouteSpec, Server,
//! };
//!
//! # async fn run() -> waypost_core::Result<()> {
//! let config = AppConfig::new()
//!     .with_routes(vec![RouteSpec::get("/", "Home").middleware("auth")])
//!     .with_controllers(
//!         ControllerRegistry::new()
//!             .with("Home", |ctx| async move { ctx.response.send("ok") }.boxed()),
//!     )
//!     .with_middlewares(
//!         MiddlewareRegistry::new()
//!             .with_fn("auth", |_shared, _req, _res| async { Ok(Next::Continue) }.boxed()),
//!     );
//!
//! Server::new(config)
//!     .start(ListenConfig::new("localhost", 3009), |msg| println!("{msg}"))
//!     .await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

extern crate self as waypost_core;

pub mod binder;
pub mod body;
pub mod compiler;
pub mod compression;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod helpers;
pub mod json;
pub mod logging;
pub mod middleware;
pub mod plugins;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod statics;
pub mod translator;

pub use binder::{build_shared, ContextBinder, MiddlewareRef};
pub use body::{JsonBodyParser, UrlEncodedParser};
pub use compiler::{RouteCompiler, RouteSpec};
pub use compression::{CompressionConfig, CompressionMiddleware};
pub use config::{AppConfig, ConfigKey, ConfigValue, Settings};
pub use context::{RequestContext, SharedContext};
pub use error::{Error, Result};
pub use futures::future::BoxFuture;
pub use futures::FutureExt;
pub use helpers::{HelperFn, Helpers};
pub use json::{parse_json, to_json};
pub use logging::{init_tracing, LogFormat};
pub use middleware::{
    from_fn, named_fn, CorsMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, Next,
};
pub use plugins::Plugins;
pub use registry::{controller, ControllerFn, ControllerRegistry, MiddlewareRegistry};
pub use request::Request;
pub use response::Response;
pub use route::{CompiledRoute, API_VERSION_PLACEHOLDER};
pub use router::{RouteMethod, RouteTable};
pub use server::{App, DefaultMiddleware, ListenConfig, Server, ServerOptions};
pub use statics::StaticFiles;
pub use translator::{ErrorBody, ErrorTranslator};
pub use waypost_macros::handler;

/// Items used by code generated from `#[handler]`
#[doc(hidden)]
pub mod __private {
    pub use futures::future::BoxFuture;
    pub use futures::FutureExt;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
