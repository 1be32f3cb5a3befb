//! Request dispatch through handler scripts.
//!
//! # Responsibilities
//! - Build the script-visible request map (method, path, params, query,
//!   headers, body)
//! - Bind the per-request context and invoke `fn handler(req)`
//! - Decide the completion: render through a template or emit data
//! - Record the request-scoped span and per-request metrics
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → request map (plain data, no host objects)
//!     → slot.load (development recompile) → engine.call_handler
//!     → payload (serde_json::Value) + context (template override)
//!     → dump=true / no template / no renderer → JSON or raw text
//!     → otherwise → renderer → text/html
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use rhai::{Dynamic, Map};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Mode, RouteMethod};
use crate::observability::metrics;
use crate::render::Renderer;
use crate::script::{ScriptEngine, ScriptSlot};

/// Request bodies are buffered before the script sees them.
const BODY_LIMIT: usize = 1024 * 1024;

/// Everything one route needs to serve a request.
pub struct RouteDispatch {
    /// Descriptor name when bound explicitly, otherwise the path.
    pub label: String,
    pub method: RouteMethod,
    pub path: String,
    /// Template bound at resolution time; scripts can override per request.
    pub template: Option<String>,
    pub slot: ScriptSlot,
    pub engine: Arc<ScriptEngine>,
    pub renderer: Option<Arc<dyn Renderer>>,
    pub mode: Mode,
}

impl RouteDispatch {
    /// Serve one request, recording the span and metrics around it.
    pub async fn handle(&self, params: Vec<(String, String)>, request: Request) -> Response {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            route = %self.label,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let started = Instant::now();
        let response = self.dispatch(params, request).instrument(span).await;
        metrics::record_request(
            &self.label,
            self.method.as_str(),
            response.status().as_u16(),
            started,
        );
        response
    }

    async fn dispatch(&self, params: Vec<(String, String)>, request: Request) -> Response {
        let query = parse_query(request.uri().query());
        let dump = query.get("dump").is_some_and(|v| v == "true");

        let (parts, body) = request.into_parts();
        let body = match to_bytes(body, BODY_LIMIT).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to buffer request body");
                return (StatusCode::BAD_REQUEST, "invalid request body").into_response();
            }
        };

        let script = match self.slot.load(&self.engine) {
            Ok(script) => script,
            Err(err) => return self.failure("load", &err),
        };

        let request_map = request_map(&parts, &params, &query, &body);
        let mut context = Dynamic::from(self.context_map());

        let payload = match self.engine.call_handler(&script.ast, request_map, &mut context) {
            Ok(value) => match rhai::serde::from_dynamic::<Value>(&value) {
                Ok(payload) => payload,
                Err(err) => return self.failure("serialize", &err),
            },
            Err(err) => return self.failure("execute", &err),
        };

        let template = template_override(context).or_else(|| self.template.clone());

        match (dump, template, &self.renderer) {
            (false, Some(template), Some(renderer)) => {
                match renderer.render(&template, &payload).await {
                    Ok(markup) => Html(markup).into_response(),
                    Err(err) => self.failure("render", &err),
                }
            }
            _ => data_response(payload),
        }
    }

    fn failure(&self, stage: &str, err: &impl std::fmt::Display) -> Response {
        tracing::error!(stage = stage, error = %err, "Handler dispatch failed");
        match self.mode {
            Mode::Production => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            Mode::Development => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{stage} error: {err}"),
            )
                .into_response(),
        }
    }

    /// `this` as seen by the script: route metadata, plus a `template`
    /// slot `set_template` fills in.
    fn context_map(&self) -> Map {
        let mut route = Map::new();
        route.insert("name".into(), self.label.clone().into());
        route.insert("path".into(), self.path.clone().into());
        route.insert("method".into(), self.method.as_str().to_string().into());
        if let Some(template) = &self.template {
            route.insert("template".into(), template.clone().into());
        }
        let mut context = Map::new();
        context.insert("route".into(), Dynamic::from(route));
        context
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

fn request_map(
    parts: &Parts,
    params: &[(String, String)],
    query: &HashMap<String, String>,
    body: &[u8],
) -> Map {
    let mut param_map = Map::new();
    for (name, value) in params {
        param_map.insert(name.as_str().into(), value.clone().into());
    }

    let mut query_map = Map::new();
    for (name, value) in query {
        query_map.insert(name.as_str().into(), value.clone().into());
    }

    let mut header_map = Map::new();
    for (name, value) in parts.headers.iter() {
        header_map.insert(
            name.as_str().into(),
            String::from_utf8_lossy(value.as_bytes()).into_owned().into(),
        );
    }

    let mut map = Map::new();
    map.insert("method".into(), parts.method.to_string().into());
    map.insert("path".into(), parts.uri.path().to_string().into());
    map.insert("params".into(), Dynamic::from(param_map));
    map.insert("query".into(), Dynamic::from(query_map));
    map.insert("headers".into(), Dynamic::from(header_map));
    map.insert(
        "body".into(),
        String::from_utf8_lossy(body).into_owned().into(),
    );
    map
}

/// Template override left in the context by `set_template`.
fn template_override(context: Dynamic) -> Option<String> {
    context
        .try_cast::<Map>()?
        .get("template")
        .cloned()?
        .into_string()
        .ok()
}

/// Emit the payload directly: objects and arrays as JSON, strings as
/// plain text, null as an empty 200, other scalars via their display form.
fn data_response(payload: Value) -> Response {
    match payload {
        Value::Null => StatusCode::OK.into_response(),
        Value::String(text) => text.into_response(),
        Value::Object(_) | Value::Array(_) => Json(payload).into_response(),
        other => other.to_string().into_response(),
    }
}
