//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! ServerOptions (builder input)
//!     → loader.rs (route file parse, default resolution)
//!     → validation.rs (semantic checks on every descriptor)
//!     → ResolvedRoutes (descriptors + discovery plan)
//!     → consumed once by App::build
//! ```
//!
//! # Design Decisions
//! - Options are resolved exactly once at construction; changing them
//!   requires building a new App
//! - All fields have defaults so `ServerOptions::default()` serves a
//!   conventional `./routes` layout
//! - Validation separates syntactic (serde) from semantic checks and
//!   applies to pre-parsed descriptors too, not just file input

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_routes, ConfigError, ResolvedRoutes};
pub use schema::{
    Mode, PathSpec, RouteDescriptor, RouteMethod, RouteOptions, RouteTags, ServerOptions,
};
pub use validation::{validate_descriptors, ValidationError, ValidationErrors};
