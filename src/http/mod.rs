//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! ServerOptions
//!     → server.rs (resolve config, discover scripts, bind routes)
//!     → axum Router (method/path matching)
//!     → dispatch.rs (request map, script call, completion policy)
//!     → response (rendered markup or data)
//!
//! unmatched paths → static file fallback (ServeDir)
//! ```

pub mod dispatch;
pub mod server;

pub use server::{App, BuildError};
