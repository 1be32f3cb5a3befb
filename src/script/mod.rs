//! Handler script subsystem.
//!
//! Handlers are Rhai scripts exporting a `fn handler(req)` entry point.
//! A script can also carry top-level routing constants (`const GET =
//! "/path"`) that bind it without an external descriptor.
//!
//! # Data Flow
//! ```text
//! script file
//!     → engine.rs (shared Engine, host bindings)
//!     → module.rs (compile, inspect `fn handler` + routing constants)
//!     → slot.rs (per-route storage, development recompile-on-change)
//!     → dispatch (call `handler` with the request, `this` = context)
//! ```
//!
//! # Design Decisions
//! - One shared `Engine` for every route; per-request state travels in
//!   the bound `this` map, never in the engine
//! - Scripts return the response payload directly; no callback protocol
//! - Routing constants are read once at construction, so changing them
//!   in development still requires a rebuild (handler bodies do not)

pub mod engine;
pub mod module;
pub mod slot;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::ScriptEngine;
pub use module::{load_module, Binding, ScriptModule};
pub use slot::{LoadedScript, ScriptSlot};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile script {path}: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: rhai::ParseError,
    },

    #[error("script evaluation failed: {0}")]
    Eval(Box<rhai::EvalAltResult>),
}
