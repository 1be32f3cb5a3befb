//! Per-route script storage with development recompile-on-change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use rhai::AST;

use crate::config::Mode;
use crate::script::engine::ScriptEngine;
use crate::script::ScriptError;

/// A compiled script body as served to requests.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    pub ast: AST,
    pub modified: Option<SystemTime>,
}

/// Holds the compiled script for one route.
///
/// Production slots never change after construction. Development slots
/// compare the source mtime on every load and swap in a fresh compile
/// when it moved, so edits show up without a restart. Concurrent loads
/// may race to recompile; every winner stores an equivalent result.
#[derive(Debug)]
pub struct ScriptSlot {
    path: PathBuf,
    mode: Mode,
    current: ArcSwap<LoadedScript>,
}

impl ScriptSlot {
    pub fn new(path: PathBuf, mode: Mode, initial: LoadedScript) -> Self {
        Self {
            path,
            mode,
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Slot that compiles on first use, for development builds where the
    /// script did not compile at construction time.
    pub fn deferred(path: PathBuf, mode: Mode) -> Self {
        Self::new(
            path,
            mode,
            LoadedScript {
                ast: AST::empty(),
                modified: None,
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current script body, recompiled first in development if the
    /// source file changed.
    pub fn load(&self, engine: &ScriptEngine) -> Result<Arc<LoadedScript>, ScriptError> {
        if self.mode.is_prod() {
            return Ok(self.current.load_full());
        }

        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|source| ScriptError::Read {
                path: self.path.clone(),
                source,
            })?;

        let cached = self.current.load_full();
        if cached.modified == Some(modified) {
            return Ok(cached);
        }

        let source = fs::read_to_string(&self.path).map_err(|source| ScriptError::Read {
            path: self.path.clone(),
            source,
        })?;
        let ast = engine.compile_named(&source, &self.path)?;
        let fresh = Arc::new(LoadedScript {
            ast,
            modified: Some(modified),
        });
        self.current.store(Arc::clone(&fresh));
        tracing::debug!(script = %self.path.display(), "Recompiled handler script");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{Dynamic, Map};
    use std::time::Duration;

    fn call(engine: &ScriptEngine, script: &Arc<LoadedScript>) -> String {
        let mut context = Dynamic::from(Map::new());
        engine
            .call_handler(&script.ast, Map::new(), &mut context)
            .unwrap()
            .into_string()
            .unwrap()
    }

    fn bump_mtime(path: &Path, ahead: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + ahead).unwrap();
    }

    #[test]
    fn development_slot_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.rhai");
        fs::write(&path, r#"fn handler(req) { "one" }"#).unwrap();

        let engine = ScriptEngine::new();
        let module = crate::script::load_module(&engine, &path).unwrap().unwrap();
        let slot = ScriptSlot::new(
            path.clone(),
            Mode::Development,
            LoadedScript {
                ast: module.ast,
                modified: module.modified,
            },
        );

        assert_eq!(call(&engine, &slot.load(&engine).unwrap()), "one");

        fs::write(&path, r#"fn handler(req) { "two" }"#).unwrap();
        bump_mtime(&path, Duration::from_secs(2));

        assert_eq!(call(&engine, &slot.load(&engine).unwrap()), "two");
    }

    #[test]
    fn production_slot_ignores_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.rhai");
        fs::write(&path, r#"fn handler(req) { "one" }"#).unwrap();

        let engine = ScriptEngine::new();
        let module = crate::script::load_module(&engine, &path).unwrap().unwrap();
        let slot = ScriptSlot::new(
            path.clone(),
            Mode::Production,
            LoadedScript {
                ast: module.ast,
                modified: module.modified,
            },
        );

        fs::write(&path, r#"fn handler(req) { "two" }"#).unwrap();
        bump_mtime(&path, Duration::from_secs(2));

        assert_eq!(call(&engine, &slot.load(&engine).unwrap()), "one");
    }

    #[test]
    fn deferred_slot_compiles_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.rhai");
        fs::write(&path, r#"fn handler(req) { "late" }"#).unwrap();

        let engine = ScriptEngine::new();
        let slot = ScriptSlot::deferred(path, Mode::Development);
        assert_eq!(call(&engine, &slot.load(&engine).unwrap()), "late");
    }

    #[test]
    fn unchanged_file_reuses_the_cached_compile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stable.rhai");
        fs::write(&path, r#"fn handler(req) { "same" }"#).unwrap();

        let engine = ScriptEngine::new();
        let slot = ScriptSlot::deferred(path, Mode::Development);
        let first = slot.load(&engine).unwrap();
        let second = slot.load(&engine).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
