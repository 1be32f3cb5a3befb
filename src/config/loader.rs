//! Route-list loading and default resolution.
//!
//! Construction options leave most things unset; this module turns them
//! into a concrete discovery plan: the descriptors to bind, the directory
//! to scan, the globs to exclude, and the static asset root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::config::schema::{RouteDescriptor, RouteOptions};
use crate::config::validation::{validate_descriptors, ValidationErrors};

/// Default discovery base when neither `include` nor `conf` is given.
pub const DEFAULT_INCLUDE_DIR: &str = "routes";

/// Directory under the discovery base served as static assets by default.
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Error type for route configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read route config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse route config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("route validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    routes: Vec<RouteDescriptor>,
}

/// Fully resolved discovery plan derived from [`RouteOptions`].
#[derive(Debug, Clone)]
pub struct ResolvedRoutes {
    /// Validated external route descriptors (possibly empty).
    pub descriptors: Vec<RouteDescriptor>,
    /// Directory scanned for handler scripts.
    pub include: PathBuf,
    /// Include glob, if the defaults were overridden.
    pub pattern: Option<String>,
    /// Exclusion globs relative to `include`.
    pub exclude: Vec<String>,
    /// Directory served as static assets.
    pub static_root: PathBuf,
}

/// Load and validate a route list from a TOML file.
pub fn load_route_file(path: &Path) -> Result<Vec<RouteDescriptor>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: RoutesFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.routes)
}

/// Resolve options into a concrete plan, applying the conventional
/// defaults and validating every descriptor regardless of its source.
pub fn resolve_routes(options: &RouteOptions) -> Result<ResolvedRoutes, ConfigError> {
    let descriptors = match (&options.routes, &options.conf) {
        (Some(routes), _) => routes.clone(),
        (None, Some(conf)) => load_route_file(conf)?,
        (None, None) => Vec::new(),
    };

    validate_descriptors(&descriptors)?;

    let include = options
        .include
        .clone()
        .or_else(|| {
            options
                .conf
                .as_deref()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INCLUDE_DIR));

    let static_root = options
        .static_root
        .clone()
        .unwrap_or_else(|| include.join(DEFAULT_STATIC_DIR));

    let exclude = options
        .exclude
        .clone()
        .unwrap_or_else(|| default_excludes(&include, &static_root));

    Ok(ResolvedRoutes {
        descriptors,
        include,
        pattern: options.pattern.clone(),
        exclude,
        static_root,
    })
}

/// Default exclusions: the static subtree (when it lives under the base)
/// and shared script modules.
fn default_excludes(include: &Path, static_root: &Path) -> Vec<String> {
    let mut excludes = Vec::new();
    if let Ok(rel) = static_root.strip_prefix(include) {
        if !rel.as_os_str().is_empty() {
            let rel = rel.to_string_lossy().replace('\\', "/");
            excludes.push(format!("{rel}/**"));
        }
    }
    excludes.push("modules/**".to_string());
    excludes
}
