//! Two-pass route resolution.
//!
//! # Responsibilities
//! - Bind external route descriptors to discovered scripts by name
//! - Bind the remaining scripts through their routing constants
//! - Filter conflicting `(method, path)` pairs before axum sees them
//!
//! # Design Decisions
//! - A descriptor claims its script even when the binding later fails,
//!   so a misconfigured route never silently re-binds by convention
//! - Production skips routes whose script will not load; development
//!   mounts them anyway and retries the compile per request

use std::collections::HashMap;

use crate::config::{Mode, RouteDescriptor, RouteMethod};
use crate::discovery::HandlerSet;
use crate::script::{load_module, Binding, LoadedScript, ScriptEngine, ScriptModule, ScriptSlot};

/// A fully bound route, ready to be registered on the router.
#[derive(Debug)]
pub struct ResolvedRoute {
    pub method: RouteMethod,
    pub path: String,
    /// Template from the descriptor tags or the script's `TEMPLATE`.
    pub template: Option<String>,
    /// The descriptor that claimed this route, when bound explicitly.
    pub descriptor: Option<RouteDescriptor>,
    pub slot: ScriptSlot,
}

/// Resolve descriptors and discovered scripts into routes.
///
/// Proceeds in two passes: descriptors first, then the scripts no
/// descriptor claimed. Claimed records are flagged in `handlers` either
/// way, so the final set doubles as an orphan report.
pub fn resolve(
    engine: &ScriptEngine,
    handlers: &mut HandlerSet,
    descriptors: &[RouteDescriptor],
    mode: Mode,
) -> Vec<ResolvedRoute> {
    let mut routes = Vec::new();
    let mut claims: HashMap<String, Vec<RouteMethod>> = HashMap::new();

    for descriptor in descriptors {
        let name = descriptor.name.as_str();
        let path = descriptor.path.value();

        let method = match &descriptor.method {
            None => RouteMethod::All,
            Some(m) => match RouteMethod::parse(m) {
                Some(method) => method,
                None => {
                    tracing::warn!(route = %name, method = %m, "Unknown method; skipping route");
                    continue;
                }
            },
        };

        let Some(index) = handlers.lookup(name) else {
            tracing::debug!(route = %name, path = %path, "No handler script for route");
            continue;
        };
        let file = match handlers.get(index) {
            Some(record) => record.file.clone(),
            None => continue,
        };
        handlers.mark_handled(index);

        if !claim(&mut claims, method, path) {
            tracing::warn!(
                route = %name,
                method = %method,
                path = %path,
                "Route conflicts with an earlier binding; skipping"
            );
            continue;
        }

        let slot = match load_module(engine, &file) {
            Ok(Some(module)) => slot_for(module, &file, mode),
            Ok(None) if mode.is_prod() => {
                tracing::warn!(
                    route = %name,
                    script = %file.display(),
                    "Script does not define `fn handler(req)`; skipping route"
                );
                release(&mut claims, method, path);
                continue;
            }
            Err(err) if mode.is_prod() => {
                tracing::warn!(
                    route = %name,
                    script = %file.display(),
                    error = %err,
                    "Failed to load handler script; skipping route"
                );
                release(&mut claims, method, path);
                continue;
            }
            // Development mounts the route regardless and retries the
            // compile on each request, so edits can fix it live.
            Ok(None) | Err(_) => {
                tracing::warn!(
                    route = %name,
                    script = %file.display(),
                    "Handler script not usable yet; compiling per request until it is"
                );
                ScriptSlot::deferred(file.clone(), mode)
            }
        };

        tracing::info!(
            route = %name,
            method = %method,
            path = %path,
            script = %file.display(),
            "Route bound from descriptor"
        );
        routes.push(ResolvedRoute {
            method,
            path: path.to_string(),
            template: descriptor.tags.template.clone(),
            descriptor: Some(descriptor.clone()),
            slot,
        });
    }

    for index in 0..handlers.len() {
        let Some(record) = handlers.get(index) else {
            break;
        };
        if record.handled {
            continue;
        }
        let file = record.file.clone();

        let module = match load_module(engine, &file) {
            Ok(Some(module)) => module,
            Ok(None) => {
                tracing::debug!(script = %file.display(), "Script exposes no handler; ignored");
                continue;
            }
            Err(err) => {
                tracing::warn!(
                    script = %file.display(),
                    error = %err,
                    "Failed to load discovered script; ignored"
                );
                continue;
            }
        };

        let ScriptModule {
            ast,
            modified,
            binding,
        } = module;
        let Binding::Descriptor {
            method,
            path,
            template,
        } = binding
        else {
            tracing::debug!(
                script = %file.display(),
                "Script has no routing constants; reachable only through descriptors"
            );
            continue;
        };

        if !path.starts_with('/') {
            tracing::warn!(
                script = %file.display(),
                path = %path,
                "Route path must start with '/'; ignored"
            );
            continue;
        }
        if !claim(&mut claims, method, &path) {
            tracing::warn!(
                script = %file.display(),
                method = %method,
                path = %path,
                "Route conflicts with an earlier binding; skipping"
            );
            continue;
        }

        handlers.mark_handled(index);
        tracing::info!(
            method = %method,
            path = %path,
            script = %file.display(),
            "Route bound by convention"
        );
        routes.push(ResolvedRoute {
            method,
            path,
            template,
            descriptor: None,
            slot: ScriptSlot::new(file, mode, LoadedScript { ast, modified }),
        });
    }

    routes
}

fn slot_for(module: ScriptModule, file: &std::path::Path, mode: Mode) -> ScriptSlot {
    ScriptSlot::new(
        file.to_path_buf(),
        mode,
        LoadedScript {
            ast: module.ast,
            modified: module.modified,
        },
    )
}

/// Claim `(method, path)`. Returns false when the pair would collide
/// with an existing registration; axum panics on duplicates, so
/// conflicts must be filtered here. `All` collides with every method.
fn claim(claims: &mut HashMap<String, Vec<RouteMethod>>, method: RouteMethod, path: &str) -> bool {
    let methods = claims.entry(path.to_string()).or_default();
    let conflict = methods
        .iter()
        .any(|&m| m == method || m == RouteMethod::All || method == RouteMethod::All);
    if conflict {
        return false;
    }
    methods.push(method);
    true
}

fn release(claims: &mut HashMap<String, Vec<RouteMethod>>, method: RouteMethod, path: &str) {
    if let Some(methods) = claims.get_mut(path) {
        methods.retain(|&m| m != method);
    }
}
