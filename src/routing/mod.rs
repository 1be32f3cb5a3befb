//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Resolution (at construction):
//!     RouteDescriptor[] + HandlerSet
//!     → resolver.rs pass 1: bind descriptors to named scripts
//!     → resolver.rs pass 2: bind leftover scripts by their constants
//!     → ResolvedRoute[] (method, path, template, script slot)
//!     → Frozen into the axum Router
//!
//! Incoming Request:
//!     handled by axum's own matcher; no routing logic at runtime
//! ```
//!
//! # Design Decisions
//! - Routes resolve once at construction, immutable at runtime
//! - Explicit descriptors always win over script constants
//! - A conflicting or unloadable binding skips that route and logs;
//!   it never takes the server down

pub mod resolver;

pub use resolver::{resolve, ResolvedRoute};
