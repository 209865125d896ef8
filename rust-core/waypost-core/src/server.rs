//! # HTTP Server
//!
//! Server lifecycle and the per-request pipeline, on Hyper and Tokio.
//!
//! `Server::start` runs, in this order:
//!
//! 1. install the default middlewares (JSON body, urlencoded body,
//!    compression, CORS)
//! 2. install the configured global middlewares
//! 3. build the shared context and compile the routes
//! 4. bind the socket, then call `on_ready` once
//!
//! Every request then flows through [`App::handle`]: global chain, route
//! lookup, route chain, controller, error translator, `after_response` hooks.
//! Graceful shutdown on CTRL+C drains open connections up to
//! `ServerOptions::shutdown_timeout`.

use crate::binder::build_shared;
use crate::body::{JsonBodyParser, UrlEncodedParser};
use crate::compiler::RouteCompiler;
use crate::compression::CompressionMiddleware;
use crate::config::{AppConfig, ConfigValue};
use crate::context::{RequestContext, SharedContext};
use crate::dispatcher::dispatch;
use crate::error::{Error, Result};
use crate::middleware::{CorsMiddleware, Middleware, MiddlewareChain, Next};
use crate::request::Request;
use crate::response::Response;
use crate::route::CompiledRoute;
use crate::router::{RouteMatch, RouteTable};
use crate::statics::StaticFiles;
use crate::translator::ErrorTranslator;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{error, info, warn};

/// Where to listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenConfig {
    /// Host name or IP address
    pub host: String,
    /// TCP port; 0 picks a free one
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ListenConfig {
    /// Listen on `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Middlewares the server installs ahead of the global ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMiddleware {
    /// [`JsonBodyParser`]
    JsonBody,
    /// [`UrlEncodedParser`]
    UrlEncoded,
    /// [`CompressionMiddleware`]
    Compression,
    /// Permissive [`CorsMiddleware`]
    Cors,
}

impl DefaultMiddleware {
    /// All defaults, in installation order
    pub const ALL: [Self; 4] = [Self::JsonBody, Self::UrlEncoded, Self::Compression, Self::Cors];

    fn instantiate(self) -> Arc<dyn Middleware> {
        match self {
            Self::JsonBody => Arc::new(JsonBodyParser::new()),
            Self::UrlEncoded => Arc::new(UrlEncodedParser::new()),
            Self::Compression => Arc::new(CompressionMiddleware::new()),
            Self::Cors => Arc::new(CorsMiddleware::new()),
        }
    }
}

/// Runtime options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Max request body size in bytes
    pub max_body_size: usize,
    /// How long shutdown waits for open connections
    pub shutdown_timeout: Duration,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Default middlewares to install
    pub defaults: Vec<DefaultMiddleware>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            shutdown_timeout: Duration::from_secs(30),
            keep_alive: true,
            defaults: DefaultMiddleware::ALL.to_vec(),
        }
    }
}

/// Declarative HTTP server
///
/// Configuration can change until `start` (or `build`) consumes the server;
/// routes are compiled exactly once.
#[derive(Debug, Default)]
pub struct Server {
    config: AppConfig,
    options: ServerOptions,
}

impl Server {
    /// Create a server from `config` with default options
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            options: ServerOptions::default(),
        }
    }

    /// Replace the runtime options
    #[must_use]
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace one configuration entry by key
    ///
    /// An empty key is a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::set`].
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        self.config.set(key, value)
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Install middlewares and compile routes without binding a socket
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingMiddleware` for an unknown middleware key.
    pub fn build(self) -> Result<App> {
        let Self { config, options } = self;

        let mut global = MiddlewareChain::new();
        for default in &options.defaults {
            global.push(default.instantiate());
        }
        for middleware in config.global_middlewares {
            global.push(middleware);
        }

        let shared = build_shared(config.plugins, config.helpers, config.settings);
        let table = RouteCompiler::new(&config.controllers, &config.middlewares, shared.config())
            .compile(&config.routes)?;

        info!(
            routes = table.len(),
            global_middlewares = ?global.names(),
            "Routes compiled"
        );

        Ok(App {
            global,
            table,
            statics: StaticFiles::new(config.statics),
            shared,
            options,
        })
    }

    /// Start serving until CTRL+C
    ///
    /// `on_ready` is called once, after the socket is listening, with a
    /// message naming the bound address.
    ///
    /// # Errors
    ///
    /// Startup errors from [`Server::build`], or `Error::BindError`.
    pub async fn start<F>(self, listen: ListenConfig, on_ready: F) -> Result<()>
    where
        F: FnOnce(String),
    {
        self.start_with_shutdown(listen, on_ready, shutdown_signal())
            .await
    }

    /// Start serving until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Startup errors from [`Server::build`], or `Error::BindError`.
    pub async fn start_with_shutdown<F, S>(
        self,
        listen: ListenConfig,
        on_ready: F,
        shutdown: S,
    ) -> Result<()>
    where
        F: FnOnce(String),
        S: Future<Output = ()>,
    {
        let app = Arc::new(self.build()?);
        let listener = bind(&listen).await?;
        let local_addr = listener.local_addr()?;

        info!("Server listening on http://{}", local_addr);
        on_ready(format!("server publish on http://{local_addr}"));

        app.serve(listener, shutdown).await
    }
}

async fn bind(listen: &ListenConfig) -> Result<TcpListener> {
    let address = listen.address();
    let bind_err = |source: std::io::Error| Error::BindError {
        address: address.clone(),
        source,
    };

    let addr = tokio::net::lookup_host(&address)
        .await
        .map_err(bind_err)?
        .next()
        .ok_or_else(|| {
            bind_err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host did not resolve to any address",
            ))
        })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(1024).map_err(bind_err)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
}

/// A compiled, ready-to-serve application
pub struct App {
    global: MiddlewareChain,
    table: RouteTable,
    statics: StaticFiles,
    shared: Arc<SharedContext>,
    options: ServerOptions,
}

impl App {
    /// The compiled route table
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// The shared context every handler sees
    #[must_use]
    pub fn shared(&self) -> &SharedContext {
        &self.shared
    }

    /// Run the whole pipeline for one request, without the network
    ///
    /// Always produces exactly one response; failures come back as the
    /// translator's 500 JSON.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new(request, Arc::clone(&self.shared));
        let mut matched = None;
        let result = self.run(&mut ctx, &mut matched).await;

        let (request, response) = ctx.into_parts();
        let mut response = ErrorTranslator::finish(result, response);

        if let Some(route) = matched {
            route.middlewares.run_after(&request, &mut response);
        }
        self.global.run_after(&request, &mut response);
        response
    }

    async fn run<'a>(
        &'a self,
        ctx: &mut RequestContext,
        matched: &mut Option<&'a CompiledRoute>,
    ) -> Result<()> {
        let (shared, req, res) = ctx.split();
        if self.global.run(shared, req, res).await? == Next::Halt {
            return Ok(());
        }

        match self.table.lookup(&ctx.request.method, &ctx.request.path) {
            Some(RouteMatch { route, params }) => {
                *matched = Some(route);
                ctx.request.set_params(params);
                dispatch(route, ctx).await
            }
            None => {
                let req = &ctx.request;
                let response = match self.statics.serve(&req.method, &req.path).await {
                    Some(file) => file,
                    None => ErrorTranslator::not_found(req.method.as_str(), &req.path),
                };
                ctx.response = response;
                Ok(())
            }
        }
    }

    async fn handle_hyper(
        &self,
        req: hyper::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> hyper::Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let version = req.version();

        let response = match Request::from_hyper_with_limit(req, self.options.max_body_size).await {
            Ok(mut request) => {
                request.remote_addr = Some(remote_addr);
                self.handle(request).await
            }
            Err(e @ Error::PayloadTooLarge { .. }) => {
                warn!(error = %e, "Rejected request body");
                Response::with_body(413, "text/plain; charset=utf-8", "Payload Too Large")
            }
            Err(e) => {
                error!(error = %e, "Failed to read request");
                Response::with_body(400, "text/plain; charset=utf-8", "Bad Request")
            }
        };

        info!(
            "    {} - \"{} {} {:?}\" {}",
            remote_addr, method, path, version, response.status
        );
        response.into_hyper()
    }

    async fn serve<S>(self: Arc<Self>, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let active = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.options.keep_alive;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let app = Arc::clone(&self);
                    let active = Arc::clone(&active);
                    active.fetch_add(1, Ordering::Relaxed);

                    tokio::task::spawn(async move {
                        let service = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move {
                                Ok::<_, Infallible>(app.handle_hyper(req, remote_addr).await)
                            }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.options.shutdown_timeout, drain)
            .await
            .is_err()
        {
            warn!(
                open = active.load(Ordering::Relaxed),
                "Shutdown timeout reached with connections still open"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("global", &self.global)
            .field("routes", &self.table)
            .field("statics", &self.statics)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
