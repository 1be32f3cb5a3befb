//! Template rendering subsystem.
//!
//! # Responsibilities
//! - Define the render seam ([`Renderer`]) dispatch talks through
//! - Ship the default Handlebars adapter with production caching
//!
//! # Design Decisions
//! - The trait takes a template identifier and a JSON payload, nothing
//!   route-specific, so adapters stay swappable
//! - Template identifiers resolve inside the static root; traversal out
//!   of it is rejected before any file IO

pub mod handlebars;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use self::handlebars::HandlebarsRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{id}` escapes the static root")]
    InvalidTemplate { id: String },

    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile template {path}: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: Box<::handlebars::TemplateError>,
    },

    #[error("template render failed: {0}")]
    Render(#[source] Box<::handlebars::RenderError>),

    #[error("render adapter failed: {0}")]
    Adapter(String),
}

/// Turns a handler payload into markup.
///
/// `template` is the identifier from the route descriptor or the
/// script's per-request override; `data` is the handler's return value
/// serialized to JSON.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;
}
