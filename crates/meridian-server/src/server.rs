//! The request server.
//!
//! One task serves each accepted connection. Every request gets a fresh
//! [`Controller`] that runs through the shared [`FilterChain`]; the outcome
//! left on the controller is rendered once the chain returns.
//!
//! Requests carrying `Upgrade: websocket` are answered with `101 Switching
//! Protocols`. The upgraded socket then enters the same chain with its
//! method rewritten to `WS`.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_server::{RouteTable, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = meridian_config::ConfigLoader::new()
//!         .with_optional_file("conf/app.toml")?
//!         .with_default_env()
//!         .load()?;
//!     meridian_telemetry::init_logging(&config.logging)?;
//!
//!     let mut routes = RouteTable::new();
//!     routes.add("GET", "/", Action::new("App.index", &[], index)?)?;
//!
//!     Server::builder()
//!         .with_config(&config)
//!         .router(routes)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http::{HeaderMap, Method};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use meridian_core::{Request, Response};
use meridian_extract::{Binders, Params};
use meridian_i18n::MessageCatalog;
use meridian_middleware::stages::{install_panic_hook, recover, ParamsFilter};
use meridian_middleware::{Controller, Filter, FilterChain, FilterChainBuilder, Stage};
use meridian_ws::{is_websocket_request, upgrade_response, validate_upgrade_request, WebSocket, WS_METHOD};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lifecycle::Lifecycle;
use crate::router::{Router, RouterFilter};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The HTTP response type produced by the server.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// Default locale cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "MERIDIAN_LANG";

/// A configured server, ready to [`run`](Self::run) or to
/// [`dispatch`](Self::dispatch) requests in-process.
pub struct Server {
    config: ServerConfig,
    chain: FilterChain,
    catalog: Arc<MessageCatalog>,
    binders: Arc<Binders>,
    dev_mode: bool,
    lifecycle: Lifecycle,
    ws_method: Method,
}

impl Server {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the transport settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the filter chain.
    #[must_use]
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Returns the message catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<MessageCatalog> {
        &self.catalog
    }

    /// Returns true in development mode.
    #[must_use]
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// See [`run_with_shutdown`](Self::run_with_shutdown).
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` is triggered.
    ///
    /// Startup hooks run first. After the signal the listener closes, open
    /// connections get up to the configured shutdown timeout to finish, and
    /// shutdown hooks run.
    ///
    /// # Errors
    ///
    /// Fails on an invalid or unbindable address or a failing hook.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        self.lifecycle.run_startup().await?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().unwrap_or(addr);

        tracing::info!(
            addr = %local_addr,
            dev_mode = self.dev_mode,
            filters = ?self.chain.names(),
            languages = ?self.catalog.languages(),
            "server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let limiter = server.config.max_connections().map(|max| Arc::new(Semaphore::new(max)));

        loop {
            let permit = match &limiter {
                Some(limiter) => tokio::select! {
                    permit = Arc::clone(limiter).acquire_owned() => permit.ok(),
                    _ = shutdown.recv() => break,
                },
                None => None,
            };

            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.serve_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "connection closed with error");
                            }
                            drop(permit);
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                _ = shutdown.recv() => break,
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?shutdown_timeout,
            "shutdown signaled, draining connections"
        );
        tokio::select! {
            _ = tracker.wait_for_shutdown() => tracing::info!("all connections closed"),
            _ = tokio::time::sleep(shutdown_timeout) => tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        server.lifecycle.run_shutdown().await?;
        tracing::info!("server stopped");
        Ok(())
    }

    /// Runs one request through the chain and renders the response.
    ///
    /// This is the whole per-request path minus the socket: no body
    /// streaming, no upgrade handling.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> HttpResponse {
        let c = self.controller(Request::from_http(req));
        self.run_chain(c).await.finish()
    }

    fn controller(&self, request: Request) -> Controller {
        Controller::new(request, Params::new(Arc::clone(&self.binders)))
            .with_catalog(Arc::clone(&self.catalog))
            .with_dev_mode(self.dev_mode)
    }

    async fn run_chain(&self, mut c: Controller) -> Controller {
        tracing::debug!(
            request_id = %c.request_id(),
            method = %c.request().method(),
            path = c.request().path(),
            "request started"
        );

        let result = AssertUnwindSafe(self.chain.run(&mut c)).catch_unwind().await;
        if let Err(payload) = result {
            // A filter outside the panic stage faulted.
            recover(&mut c, payload.as_ref(), self.dev_mode);
        }
        c
    }

    async fn serve_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, remote_addr).await) }
        });

        let conn = http1::Builder::new()
            .serve_connection(io, service)
            .with_upgrades();
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            _ = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        self: &Arc<Self>,
        req: http::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> HttpResponse {
        if is_websocket_request(req.headers()) {
            return self.accept_websocket(req, remote_addr);
        }

        let limit = self.config.max_body_bytes();
        if declared_length(req.headers()).is_some_and(|len| len > limit as u64) {
            tracing::warn!(remote_addr = %remote_addr, limit, "request body exceeds limit");
            return plain_response(413, "request body too large");
        }

        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(remote_addr = %remote_addr, limit, "request body exceeds limit");
                return plain_response(413, "request body too large");
            }
            Err(e) => {
                tracing::warn!(remote_addr = %remote_addr, error = %e, "failed to read request body");
                return plain_response(400, "failed to read request body");
            }
        };

        let request = Request::new(parts, body).with_remote_addr(remote_addr);
        self.run_chain(self.controller(request)).await.finish()
    }

    fn accept_websocket(
        self: &Arc<Self>,
        mut req: http::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> HttpResponse {
        let response = match validate_upgrade_request(req.headers())
            .and_then(|accept| upgrade_response(&accept))
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(remote_addr = %remote_addr, error = %e, "rejected websocket upgrade");
                return plain_response(400, &e.to_string());
            }
        };

        let on_upgrade = hyper::upgrade::on(&mut req);
        let (mut parts, _) = req.into_parts();
        parts.method = self.ws_method.clone();
        parts.headers = strip_body_headers(parts.headers);

        let server = Arc::clone(self);
        tokio::spawn(async move {
            let upgraded = match on_upgrade.await {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    tracing::warn!(remote_addr = %remote_addr, error = %e, "websocket upgrade failed");
                    return;
                }
            };

            let socket = WebSocket::accept(TokioIo::new(upgraded)).await;
            let request = Request::new(parts, Bytes::new()).with_remote_addr(remote_addr);
            let c = server.controller(request).with_websocket(socket);
            let c = server.run_chain(c).await;
            if c.has_outcome() {
                tracing::debug!(
                    request_id = %c.request_id(),
                    action = c.action_name().unwrap_or("-"),
                    "websocket request produced an outcome; discarding it"
                );
            }
        });

        response
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("dev_mode", &self.dev_mode)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn plain_response(status: u16, body: &str) -> HttpResponse {
    let mut response = Response::new();
    response.write_header(status, "text/plain; charset=utf-8");
    response.write(body.as_bytes());
    response.into_http()
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn strip_body_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.remove(http::header::CONTENT_TYPE);
    headers.remove(http::header::CONTENT_LENGTH);
    headers
}

enum ChainEdit {
    Before(Stage, Arc<dyn Filter>),
    After(Stage, Arc<dyn Filter>),
    Append(Arc<dyn Filter>),
}

/// Builder for [`Server`].
///
/// The chain defaults to the router (when one is set) followed by the
/// standard i18n, params, panic and invoker stages. Extra filters are
/// placed relative to those stages.
pub struct ServerBuilder {
    config: ServerConfig,
    router: Option<Arc<dyn Router>>,
    catalog: Option<Arc<MessageCatalog>>,
    binders: Binders,
    cookie_name: String,
    dev_mode: bool,
    lifecycle: Lifecycle,
    upload_memory: Option<usize>,
    edits: Vec<ChainEdit>,
    chain: Option<FilterChain>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    /// Creates a builder with default settings and no routes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            router: None,
            catalog: None,
            binders: Binders::default(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            dev_mode: false,
            lifecycle: Lifecycle::new(),
            upload_memory: None,
            edits: Vec::new(),
            chain: None,
        }
    }

    /// Applies application configuration.
    ///
    /// Sets the transport settings, dev mode and cookie name, and loads the
    /// message catalog from the configured directory.
    #[must_use]
    pub fn with_config(mut self, config: &meridian_config::MeridianConfig) -> Self {
        self.config = ServerConfig::from(&config.server);
        self.dev_mode = config.app.dev_mode;
        self.cookie_name = config.cookie_name();
        self.catalog = Some(Arc::new(MessageCatalog::load(
            config.messages_dir(),
            config.default_language(),
        )));
        self
    }

    /// Sets the transport settings.
    #[must_use]
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the router.
    #[must_use]
    pub fn router(self, router: impl Router) -> Self {
        self.router_arc(Arc::new(router))
    }

    /// Sets a shared router.
    #[must_use]
    pub fn router_arc(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the message catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Replaces the binder registry.
    #[must_use]
    pub fn binders(mut self, binders: Binders) -> Self {
        self.binders = binders;
        self
    }

    /// Sets the locale cookie name.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Enables development mode.
    #[must_use]
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Sets startup and shutdown hooks.
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Sets the per-request memory budget for multipart uploads. File parts
    /// beyond it are written to temporary files.
    #[must_use]
    pub fn upload_memory(mut self, bytes: usize) -> Self {
        self.upload_memory = Some(bytes);
        self
    }

    /// Inserts a filter immediately before a core stage.
    #[must_use]
    pub fn filter_before<F: Filter>(mut self, stage: Stage, filter: F) -> Self {
        self.edits.push(ChainEdit::Before(stage, Arc::new(filter)));
        self
    }

    /// Inserts a filter immediately after a core stage.
    #[must_use]
    pub fn filter_after<F: Filter>(mut self, stage: Stage, filter: F) -> Self {
        self.edits.push(ChainEdit::After(stage, Arc::new(filter)));
        self
    }

    /// Appends a filter at the end of the chain.
    #[must_use]
    pub fn filter<F: Filter>(mut self, filter: F) -> Self {
        self.edits.push(ChainEdit::Append(Arc::new(filter)));
        self
    }

    /// Uses a fully assembled chain instead of the default one.
    ///
    /// Router, cookie name and filter placements are ignored.
    #[must_use]
    pub fn chain(mut self, chain: FilterChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Chain`] if a placement names a missing stage.
    pub fn build(self) -> Result<Server, ServerError> {
        install_panic_hook();
        let chain = match self.chain {
            Some(chain) => chain,
            None => {
                let mut builder = FilterChainBuilder::standard(self.cookie_name, self.dev_mode);
                if let Some(bytes) = self.upload_memory {
                    builder = builder.replace(Stage::Params, ParamsFilter::with_max_memory(bytes));
                }
                if let Some(router) = self.router {
                    builder = builder.prepend(RouterFilter::new(router));
                }
                for edit in self.edits {
                    builder = match edit {
                        ChainEdit::Before(stage, filter) => builder.before_arc(stage, filter),
                        ChainEdit::After(stage, filter) => builder.after_arc(stage, filter),
                        ChainEdit::Append(filter) => builder.filter_arc(filter),
                    };
                }
                builder.build()?
            }
        };

        let ws_method = Method::from_bytes(WS_METHOD.as_bytes())
            .map_err(|e| ServerError::invalid_route(WS_METHOD, "*", e.to_string()))?;

        Ok(Server {
            config: self.config,
            chain,
            catalog: self
                .catalog
                .unwrap_or_else(|| Arc::new(MessageCatalog::default())),
            binders: Arc::new(self.binders),
            dev_mode: self.dev_mode,
            lifecycle: self.lifecycle,
            ws_method,
        })
    }
}
