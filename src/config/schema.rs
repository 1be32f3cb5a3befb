//! Configuration schema definitions.
//!
//! This module defines the construction options for the server and the
//! shape of externally supplied route descriptors. Descriptor types derive
//! Serde traits so a route list can be deserialized from a TOML file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::render::Renderer;

/// Environment variable consulted when `is_prod` is not set explicitly.
pub const MODE_ENV_VAR: &str = "WAYPOST_ENV";

/// Run mode, selecting caching behavior for scripts and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scripts are recompiled when their source changes; templates are
    /// re-read on every render.
    Development,
    /// Scripts are compiled once at construction; compiled templates are
    /// cached per absolute path.
    Production,
}

impl Mode {
    /// Derive the mode from `WAYPOST_ENV` (`"production"` selects
    /// [`Mode::Production`], anything else is development).
    pub fn from_env() -> Self {
        match std::env::var(MODE_ENV_VAR) {
            Ok(v) if v.eq_ignore_ascii_case("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    pub fn is_prod(self) -> bool {
        self == Mode::Production
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Top-level construction options.
///
/// Everything is optional; defaults mirror a conventional layout where
/// handler scripts live under `./routes` with static assets in
/// `./routes/public`.
#[derive(Default)]
pub struct ServerOptions {
    /// Force production or development behavior. `None` falls back to
    /// [`Mode::from_env`].
    pub is_prod: Option<bool>,

    /// Handler discovery and route binding options.
    pub routes: RouteOptions,

    /// Render adapter applied when a route resolves to a template.
    /// `None` disables rendering and payloads are returned directly.
    pub render: Option<Arc<dyn Renderer>>,
}

impl ServerOptions {
    pub fn mode(&self) -> Mode {
        match self.is_prod {
            Some(true) => Mode::Production,
            Some(false) => Mode::Development,
            None => Mode::from_env(),
        }
    }
}

/// Options controlling handler discovery and the external route list.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Path to a TOML route-list file (`[[routes]]` entries).
    pub conf: Option<PathBuf>,

    /// Pre-parsed route descriptors; takes precedence over `conf`.
    pub routes: Option<Vec<RouteDescriptor>>,

    /// Base directory for handler discovery. Defaults to the directory
    /// containing `conf`, else `./routes`.
    pub include: Option<PathBuf>,

    /// Include glob applied to paths relative to the base.
    /// Defaults to every `.rhai` file under the base.
    pub pattern: Option<String>,

    /// Exclusion globs, relative to the base. Defaults to the static root
    /// subtree plus `modules/**` (shared scripts imported by handlers).
    pub exclude: Option<Vec<String>>,

    /// Directory served as static assets. Defaults to `<include>/public`.
    pub static_root: Option<PathBuf>,
}

/// Externally supplied binding of an HTTP method and path to a named
/// handler, optionally tagged with a template identifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDescriptor {
    /// HTTP method, case-insensitive. Defaults to `all`.
    #[serde(default)]
    pub method: Option<String>,

    /// Route path in axum syntax (`/users/{id}`).
    pub path: PathSpec,

    /// Handler lookup key: a short name (file stem) or full name
    /// (relative path with `_` separators).
    pub name: String,

    /// Free-form tags; only `template` is interpreted here.
    #[serde(default)]
    pub tags: RouteTags,
}

/// A route path, either a bare string or a `{ value = "..." }` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathSpec {
    Plain(String),
    Tagged { value: String },
}

impl PathSpec {
    pub fn value(&self) -> &str {
        match self {
            PathSpec::Plain(s) => s,
            PathSpec::Tagged { value } => value,
        }
    }
}

/// Descriptor tags recognized by the dispatcher.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteTags {
    /// Template identifier handed to the render adapter.
    pub template: Option<String>,
}

/// HTTP methods a route can bind to. `All` matches any method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    All,
}

impl RouteMethod {
    /// Parse a method name, case-insensitively. Returns `None` for
    /// anything the router cannot register.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(RouteMethod::Get),
            "post" => Some(RouteMethod::Post),
            "put" => Some(RouteMethod::Put),
            "delete" => Some(RouteMethod::Delete),
            "patch" => Some(RouteMethod::Patch),
            "head" => Some(RouteMethod::Head),
            "options" => Some(RouteMethod::Options),
            "all" => Some(RouteMethod::All),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteMethod::Get => "get",
            RouteMethod::Post => "post",
            RouteMethod::Put => "put",
            RouteMethod::Delete => "delete",
            RouteMethod::Patch => "patch",
            RouteMethod::Head => "head",
            RouteMethod::Options => "options",
            RouteMethod::All => "all",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
