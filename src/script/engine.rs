//! Shared script engine and host bindings.

use std::path::Path;

use rhai::{CallFnOptions, Dynamic, Engine, Map, Scope, AST};

use crate::script::ScriptError;

/// Operation ceiling per script invocation, guarding against runaway loops.
const MAX_OPERATIONS: u64 = 5_000_000;

/// The shared Rhai engine all handler scripts compile and run against.
///
/// The engine itself is stateless between calls; anything a handler may
/// touch per request is passed in as arguments or through the bound
/// `this` context map.
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);

        engine.on_print(|text| {
            tracing::info!(target: "waypost::script", "{text}");
        });
        engine.on_debug(|text, source, pos| {
            tracing::debug!(
                target: "waypost::script",
                source = source.unwrap_or(""),
                position = %pos,
                "{text}"
            );
        });

        // `this.log("...")` writes through the route's log scope.
        engine.register_fn("log", |context: &mut Map, message: &str| {
            let route = route_label(context);
            tracing::info!(target: "waypost::handler", route = %route, "{message}");
        });

        // `this.set_template("...")` overrides the route template for
        // this request only.
        engine.register_fn("set_template", |context: &mut Map, template: &str| {
            context.insert("template".into(), template.to_string().into());
        });

        Self { engine }
    }

    /// Compile a script, tagging the AST with its source path for error
    /// positions and stack traces.
    pub fn compile_named(&self, source: &str, path: &Path) -> Result<AST, ScriptError> {
        let mut ast = self
            .engine
            .compile(source)
            .map_err(|err| ScriptError::Compile {
                path: path.to_path_buf(),
                source: err,
            })?;
        ast.set_source(path.to_string_lossy().as_ref());
        Ok(ast)
    }

    /// Invoke `fn handler(req)` with `this` bound to the context map.
    ///
    /// Top-level statements run first, then the function; the returned
    /// value is the response payload.
    pub fn call_handler(
        &self,
        ast: &AST,
        request: Map,
        context: &mut Dynamic,
    ) -> Result<Dynamic, ScriptError> {
        let mut scope = Scope::new();
        let options = CallFnOptions::new().bind_this_ptr(context);
        self.engine
            .call_fn_with_options(options, &mut scope, ast, "handler", (request,))
            .map_err(ScriptError::Eval)
    }

    pub(crate) fn raw(&self) -> &Engine {
        &self.engine
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn route_label(context: &Map) -> String {
    context
        .get("route")
        .cloned()
        .and_then(|d| d.try_cast::<Map>())
        .and_then(|route| {
            route
                .get("name")
                .or_else(|| route.get("path"))
                .cloned()
                .and_then(|d| d.into_string().ok())
        })
        .unwrap_or_else(|| "?".to_string())
}
