//! Backend discovery from the package directory layout.
//!
//! Discovery walks the immediate submodules of the package root. A submodule
//! takes part when it contains a backend directory; every file
//! `<backend_dir>/<target>_<backend>.<ext>` whose sibling `<target>.<ext>`
//! exists declares `<backend>` as an alternative implementation of module
//! `<root>.<submodule>.<target>`.
//!
//! Nothing is parsed or loaded here. Which functions a backend provides is
//! only determined once a function of that module becomes eligible.

use crate::config::SourceLayout;
use crate::error::DiscoveryError;
use crate::names::{BackendName, Backends, ModulePath};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use walkdir::WalkDir;

/// Result of scanning the package tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    backends: Backends,
    modules: BTreeMap<ModulePath, BTreeSet<BackendName>>,
}

impl Discovery {
    /// Empty discovery: only the default backend, no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `module` has a `backend` counterpart.
    pub fn record(&mut self, module: ModulePath, backend: BackendName) {
        self.backends.insert(backend.clone());
        self.modules.entry(module).or_default().insert(backend);
    }

    /// Every backend name seen anywhere in the tree, plus the default.
    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Modules with at least one backend counterpart.
    pub fn modules(&self) -> impl Iterator<Item = (&ModulePath, &BTreeSet<BackendName>)> {
        self.modules.iter()
    }

    /// Non-default backends declared for `module`.
    pub fn backends_for(&self, module: &ModulePath) -> Option<&BTreeSet<BackendName>> {
        self.modules.get(module)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Scans the package tree described by `layout`.
///
/// # Errors
///
/// Fails if the root directory is missing or cannot be listed. Unreadable
/// submodule directories are skipped.
pub fn scan(layout: &SourceLayout) -> Result<Discovery, DiscoveryError> {
    let root_module = layout.root_module()?;
    let root_dir = &layout.root_dir;
    if !root_dir.is_dir() {
        return Err(DiscoveryError::NotADirectory(root_dir.clone()));
    }

    let mut discovery = Discovery::new();

    for entry in WalkDir::new(root_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(DiscoveryError::ReadRoot {
                    path: root_dir.clone(),
                    source: err,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable package entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(submodule) = entry.file_name().to_str().filter(|n| is_identifier(n)) else {
            continue;
        };

        let submodule_dir = entry.path();
        let backend_dir = submodule_dir.join(&layout.backend_dir);
        if !backend_dir.is_dir() {
            continue;
        }

        let Ok(submodule_path) = root_module.child(submodule) else {
            continue;
        };
        let sources = source_stems(submodule_dir, &layout.extension);

        for stem in source_stems(&backend_dir, &layout.extension) {
            let Some((target, backend)) = split_backend_stem(&stem) else {
                tracing::trace!(file = %stem, "backend file name has no backend suffix");
                continue;
            };
            if !sources.contains(target) {
                tracing::trace!(file = %stem, "orphan backend file ignored");
                continue;
            }
            let Ok(module) = submodule_path.child(target) else {
                continue;
            };
            discovery.record(module, backend);
        }
    }

    tracing::debug!(
        root = %root_dir.display(),
        modules = discovery.module_count(),
        backends = discovery.backends().len(),
        "backend discovery complete"
    );
    Ok(discovery)
}

/// Splits `<target>_<backend>` on the last underscore.
fn split_backend_stem(stem: &str) -> Option<(&str, BackendName)> {
    let (target, backend) = stem.rsplit_once('_')?;
    if !is_identifier(target) {
        return None;
    }
    let backend = BackendName::new(backend).ok()?;
    Some((target, backend))
}

/// File stems of regular files with `extension` directly inside `dir`.
fn source_stems(dir: &Path, extension: &str) -> BTreeSet<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some(extension))
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
