//! Convention-based script routing for axum.
//!
//! Waypost scans a directory of Rhai handler scripts, binds them to
//! HTTP routes from an external route list or from constants declared
//! in the scripts themselves, and serves the result on axum with a
//! static-asset fallback and optional template rendering.
//!
//! # Architecture Overview
//!
//! ```text
//!   ServerOptions ──▶ config ──▶ discovery ──▶ routing::resolver
//!                      (plan)     (scan .rhai)   (descriptors, then
//!                                                 script constants)
//!                                                      │
//!                                                      ▼
//!   Request ──▶ axum Router ──▶ http::dispatch ──▶ script::engine
//!                  │                  │                 │
//!                  ▼                  ▼                 ▼
//!             static files      render adapter     fn handler(req)
//!             (fallback)        (Handlebars)       returns payload
//! ```
//!
//! # Example
//!
//! ```no_run
//! use waypost::{App, RouteOptions, ServerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::build(ServerOptions {
//!         routes: RouteOptions {
//!             conf: Some("site/routes.toml".into()),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     })?;
//!     app.listen("0.0.0.0:8080").await?;
//!     Ok(())
//! }
//! ```

// Core subsystems
pub mod config;
pub mod discovery;
pub mod http;
pub mod routing;
pub mod script;

// Rendering
pub mod render;

// Cross-cutting concerns
pub mod observability;

pub use config::{Mode, PathSpec, RouteDescriptor, RouteMethod, RouteOptions, RouteTags, ServerOptions};
pub use discovery::{HandlerRecord, HandlerSet};
pub use http::{App, BuildError};
pub use render::{HandlebarsRenderer, RenderError, Renderer};
