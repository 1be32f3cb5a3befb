//! Default Handlebars render adapter.

use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::Value;

use crate::config::Mode;
use crate::observability::metrics;
use crate::render::{RenderError, Renderer};

/// Renders templates from the static root.
///
/// In production, compiled templates are cached in the registry keyed by
/// absolute path, so each template file is read and parsed once. In
/// development every render re-reads the file.
pub struct HandlebarsRenderer {
    static_root: PathBuf,
    mode: Mode,
    registry: RwLock<Handlebars<'static>>,
}

impl HandlebarsRenderer {
    pub fn new(static_root: PathBuf, mode: Mode) -> Self {
        Self {
            static_root,
            mode,
            registry: RwLock::new(Handlebars::new()),
        }
    }

    /// Resolve a template identifier against the static root, rejecting
    /// absolute paths and parent traversal.
    fn resolve(&self, template: &str) -> Result<PathBuf, RenderError> {
        let rel = Path::new(template);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(RenderError::InvalidTemplate {
                id: template.to_string(),
            });
        }
        Ok(self.static_root.join(rel))
    }

    async fn read_template(path: &Path) -> Result<String, RenderError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RenderError::Read {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl Renderer for HandlebarsRenderer {
    async fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        let path = self.resolve(template)?;

        if !self.mode.is_prod() {
            let contents = Self::read_template(&path).await?;
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            return registry
                .render_template(&contents, data)
                .map_err(|e| RenderError::Render(Box::new(e)));
        }

        let key = path.to_string_lossy().into_owned();
        {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            if registry.has_template(&key) {
                metrics::record_template_cache(true);
                return registry
                    .render(&key, data)
                    .map_err(|e| RenderError::Render(Box::new(e)));
            }
        }

        metrics::record_template_cache(false);
        let contents = Self::read_template(&path).await?;
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !registry.has_template(&key) {
            registry
                .register_template_string(&key, &contents)
                .map_err(|source| RenderError::Compile {
                    path,
                    source: Box::new(source),
                })?;
        }
        registry
            .render(&key, data)
            .map_err(|e| RenderError::Render(Box::new(e)))
    }
}
