//! Compiled handler modules and binding inspection.

use std::path::Path;
use std::time::SystemTime;

use rhai::{ImmutableString, Module, Scope, AST};

use crate::config::RouteMethod;
use crate::script::engine::ScriptEngine;
use crate::script::ScriptError;

/// How a script asked to be routed, read from its top-level constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// No routing constants; the script can only be bound through an
    /// external route descriptor.
    Function,
    /// Self-describing script. `PATH` and `GET` bind a GET route (`PATH`
    /// wins when both are present), then `POST`, then `ALL`.
    Descriptor {
        method: RouteMethod,
        path: String,
        template: Option<String>,
    },
}

/// A compiled script together with its binding and source mtime.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    pub ast: AST,
    pub modified: Option<SystemTime>,
    pub binding: Binding,
}

/// Read, compile and inspect one handler script.
///
/// Returns `Ok(None)` when the file compiles but does not define a
/// one-argument `fn handler`; such files are not handler modules.
pub fn load_module(engine: &ScriptEngine, path: &Path) -> Result<Option<ScriptModule>, ScriptError> {
    let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = std::fs::metadata(path).ok().and_then(|m| m.modified().ok());
    let ast = engine.compile_named(&source, path)?;

    match inspect_binding(engine, &ast)? {
        Some(binding) => Ok(Some(ScriptModule {
            ast,
            modified,
            binding,
        })),
        None => Ok(None),
    }
}

/// Inspect an AST for the handler entry point and routing constants.
pub fn inspect_binding(engine: &ScriptEngine, ast: &AST) -> Result<Option<Binding>, ScriptError> {
    let has_handler = ast
        .iter_functions()
        .any(|f| f.name == "handler" && f.params.len() == 1);
    if !has_handler {
        return Ok(None);
    }

    // Evaluating the top level captures `const` declarations as module
    // variables without calling the handler.
    let module =
        Module::eval_ast_as_new(Scope::new(), ast, engine.raw()).map_err(ScriptError::Eval)?;
    let constant = |name: &str| {
        module
            .get_var_value::<ImmutableString>(name)
            .map(|s| s.to_string())
    };

    let template = constant("TEMPLATE");
    let binding = if let Some(path) = constant("PATH").or_else(|| constant("GET")) {
        Binding::Descriptor {
            method: RouteMethod::Get,
            path,
            template,
        }
    } else if let Some(path) = constant("POST") {
        Binding::Descriptor {
            method: RouteMethod::Post,
            path,
            template,
        }
    } else if let Some(path) = constant("ALL") {
        Binding::Descriptor {
            method: RouteMethod::All,
            path,
            template,
        }
    } else {
        Binding::Function
    };

    Ok(Some(binding))
}
