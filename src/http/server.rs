//! Server facade: build, layer, listen.
//!
//! # Responsibilities
//! - Resolve options into bound routes and wire them onto an axum Router
//! - Mount the static-asset fallback and baseline middleware
//! - Expose `layer` for caller middleware and `handlers` for inspection
//! - Bind the listener and serve with graceful shutdown
//!
//! # Design Decisions
//! - Construction is two-phase: `build` assembles everything, `listen`
//!   or `serve` runs it, so middleware can be layered in between
//! - The static fallback is mounted during `build`; later `layer` calls
//!   wrap it along with every route
//! - Conflicting bindings were filtered during resolution, so `route`
//!   registration here cannot panic

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{RawPathParams, Request};
use axum::response::IntoResponse;
use axum::routing::{any, delete, get, head, patch, post, put, Route};
use axum::Router;
use thiserror::Error;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::{Layer, Service};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{self, Mode, RouteMethod, ServerOptions};
use crate::discovery::{self, HandlerSet};
use crate::http::dispatch::RouteDispatch;
use crate::routing::resolver;
use crate::script::ScriptEngine;

/// Request deadline applied to every route and the static fallback.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Discovery(#[from] discovery::DiscoveryError),
}

/// A configured server, ready for extra middleware or `listen`.
#[derive(Debug)]
pub struct App {
    router: Router,
    handlers: HandlerSet,
    mode: Mode,
    routes: usize,
}

impl App {
    /// Resolve options, discover and bind handler scripts, and assemble
    /// the router with the static fallback underneath.
    pub fn build(options: ServerOptions) -> Result<Self, BuildError> {
        let mode = options.mode();
        let resolved = config::resolve_routes(&options.routes)?;

        tracing::info!(
            mode = %mode,
            include = %resolved.include.display(),
            static_root = %resolved.static_root.display(),
            "Building server"
        );

        let pattern = resolved
            .pattern
            .as_deref()
            .unwrap_or(discovery::DEFAULT_PATTERN);
        let mut handlers = discovery::scan(&resolved.include, pattern, &resolved.exclude)?;

        let engine = Arc::new(ScriptEngine::new());
        let bound = resolver::resolve(&engine, &mut handlers, &resolved.descriptors, mode);
        let routes = bound.len();

        for orphan in handlers.orphans() {
            tracing::debug!(
                script = %orphan.file.display(),
                "Discovered script not bound to any route"
            );
        }

        let mut router = Router::new();
        for route in bound {
            let path = route.path.clone();
            let method = route.method;
            let label = route
                .descriptor
                .as_ref()
                .map(|d| d.name.clone())
                .unwrap_or_else(|| route.path.clone());
            let dispatch = Arc::new(RouteDispatch {
                label,
                method: route.method,
                path: route.path,
                template: route.template,
                slot: route.slot,
                engine: Arc::clone(&engine),
                renderer: options.render.clone(),
                mode,
            });
            let handler = move |params: RawPathParams, request: Request| {
                let dispatch = Arc::clone(&dispatch);
                let params: Vec<(String, String)> = params
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                async move { dispatch.handle(params, request).await }
            };
            let endpoint = match method {
                RouteMethod::Get => get(handler),
                RouteMethod::Post => post(handler),
                RouteMethod::Put => put(handler),
                RouteMethod::Delete => delete(handler),
                RouteMethod::Patch => patch(handler),
                RouteMethod::Head => head(handler),
                RouteMethod::Options => axum::routing::options(handler),
                RouteMethod::All => any(handler),
            };
            router = router.route(&path, endpoint);
        }

        let router = router
            .fallback_service(ServeDir::new(&resolved.static_root))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http());

        Ok(Self {
            router,
            handlers,
            mode,
            routes,
        })
    }

    /// Layer extra middleware over everything built so far, the static
    /// fallback included.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.router = self.router.layer(layer);
        self
    }

    /// Discovery results, including which scripts routes claimed.
    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Number of routes bound at construction.
    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// The assembled router, for embedding into a larger axum app.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind `addr` and serve until shutdown.
    pub async fn listen<A: ToSocketAddrs>(self, addr: A) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an existing listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.mode,
            routes = self.routes,
            "Server listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
