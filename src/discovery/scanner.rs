//! Filesystem scan for handler scripts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use thiserror::Error;

/// Include glob applied when the options leave it unset.
pub const DEFAULT_PATTERN: &str = "**/*.rhai";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("discovery base {path} is not a directory")]
    NotADirectory { path: PathBuf },
}

/// A discovered handler script and its lookup names.
#[derive(Debug, Clone)]
pub struct HandlerRecord {
    /// Absolute path to the script file.
    pub file: PathBuf,
    /// File stem, e.g. `hello` for `api/hello.rhai`.
    pub short_name: String,
    /// Relative path with separators flattened to `_` and the extension
    /// stripped, e.g. `api_hello`.
    pub full_name: String,
    /// Whether a route has claimed this script.
    pub handled: bool,
}

/// All discovered handler scripts, indexed by both name forms.
///
/// Short names are not guaranteed unique; the record scanned last keeps
/// the short index entry. Full names are unique by construction.
#[derive(Debug, Default)]
pub struct HandlerSet {
    records: Vec<HandlerRecord>,
    by_short: HashMap<String, usize>,
    by_full: HashMap<String, usize>,
}

impl HandlerSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HandlerRecord> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HandlerRecord> {
        self.records.get(index)
    }

    /// Look a handler up by short name first, then full name.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_short
            .get(name)
            .or_else(|| self.by_full.get(name))
            .copied()
    }

    pub fn mark_handled(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.handled = true;
        }
    }

    /// Scripts no route has claimed. Useful for spotting dead files.
    pub fn orphans(&self) -> impl Iterator<Item = &HandlerRecord> {
        self.records.iter().filter(|r| !r.handled)
    }

    fn insert(&mut self, record: HandlerRecord) {
        let index = self.records.len();
        self.by_short.insert(record.short_name.clone(), index);
        self.by_full.insert(record.full_name.clone(), index);
        self.records.push(record);
    }
}

/// Scan `base` for scripts matching `pattern`, skipping `exclude` globs.
///
/// A missing base yields an empty set rather than an error so a server
/// can come up with only external routes or static assets.
pub fn scan(base: &Path, pattern: &str, exclude: &[String]) -> Result<HandlerSet, DiscoveryError> {
    let mut set = HandlerSet::default();

    if !base.exists() {
        tracing::warn!(base = %base.display(), "Discovery base does not exist; no handlers loaded");
        return Ok(set);
    }
    if !base.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            path: base.to_path_buf(),
        });
    }
    let base = base
        .canonicalize()
        .map_err(|source| DiscoveryError::Walk {
            path: base.to_path_buf(),
            source: source.into(),
        })?;

    let include = compile_globs(&[pattern.to_string()])?;
    let exclude = compile_globs(exclude)?;

    let mut found = Vec::new();
    for entry in WalkBuilder::new(&base).standard_filters(false).build() {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: base.clone(),
            source,
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        let rel = path.strip_prefix(&base).unwrap_or(&path).to_path_buf();
        if !include.is_match(&rel) || exclude.is_match(&rel) {
            continue;
        }
        found.push((rel, path));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));

    for (rel, file) in found {
        let short_name = rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let full_name = rel
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("_");
        set.insert(HandlerRecord {
            file,
            short_name,
            full_name,
            handled: false,
        });
    }

    tracing::debug!(base = %base.display(), count = set.len(), "Handler scan complete");
    Ok(set)
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DiscoveryError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}
