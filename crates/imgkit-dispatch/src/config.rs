//! Package layout configuration.
//!
//! A [`SourceLayout`] tells discovery and registration where the package lives
//! on disk and how backend files are named:
//!
//! ```text
//! <root_dir>/<submodule>/<target>.<extension>
//! <root_dir>/<submodule>/<backend_dir>/<target>_<backend>.<extension>
//! ```

use crate::error::ConfigError;
use crate::names::{BackendName, ModulePath};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

fn default_backend_dir() -> String {
    "backend".to_string()
}

fn default_extension() -> String {
    "rs".to_string()
}

/// Where the package lives and how its backend files are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceLayout {
    /// Dotted name of the root package, e.g. `imgkit`.
    pub root_package: String,
    /// Directory holding the root package's submodules.
    pub root_dir: PathBuf,
    /// Name of the per-submodule directory holding backend files.
    #[serde(default = "default_backend_dir")]
    pub backend_dir: String,
    /// Source file extension without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl SourceLayout {
    /// Layout with the conventional `backend` directory and `.rs` files.
    pub fn new(root_package: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_package: root_package.into(),
            root_dir: root_dir.into(),
            backend_dir: default_backend_dir(),
            extension: default_extension(),
        }
    }

    pub fn with_backend_dir(mut self, backend_dir: impl Into<String>) -> Self {
        self.backend_dir = backend_dir.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Parses a layout from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let layout: SourceLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Reads a layout from a JSON file.
    ///
    /// A relative `root_dir` is resolved against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut layout = Self::from_json_str(&content)?;
        if layout.root_dir.is_relative() {
            if let Some(dir) = path.parent() {
                layout.root_dir = dir.join(&layout.root_dir);
            }
        }
        Ok(layout)
    }

    /// Checks that every field can be used to build paths and module names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ModulePath::parse(self.root_package.clone())?;

        let mut components = Path::new(&self.backend_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(ConfigError::invalid(
                    "backend_dir",
                    format!("'{}' must be a single directory name", self.backend_dir),
                ))
            }
        }
        if self.backend_dir.contains('.') {
            return Err(ConfigError::invalid(
                "backend_dir",
                "must not contain '.' because it becomes a module path segment",
            ));
        }

        if self.extension.is_empty() || self.extension.contains('.') {
            return Err(ConfigError::invalid(
                "extension",
                format!("'{}' must be non-empty and without a dot", self.extension),
            ));
        }
        Ok(())
    }

    /// Root package as a module path.
    pub fn root_module(&self) -> Result<ModulePath, ConfigError> {
        Ok(ModulePath::parse(self.root_package.clone())?)
    }

    /// Directory holding the source file of `module`, or `None` when the
    /// module is not inside the root package.
    pub fn module_dir(&self, module: &ModulePath) -> Option<PathBuf> {
        let root = ModulePath::parse(self.root_package.clone()).ok()?;
        if !module.starts_with(&root) || module == &root {
            return None;
        }
        let root_len = root.segments().count();
        let segments: Vec<&str> = module.segments().collect();
        let mut dir = self.root_dir.clone();
        for segment in &segments[root_len..segments.len() - 1] {
            dir.push(segment);
        }
        Some(dir)
    }

    /// Expected source file of `module`'s `backend` counterpart.
    pub fn backend_file(&self, module: &ModulePath, backend: &BackendName) -> Option<PathBuf> {
        let dir = self.module_dir(module)?;
        Some(dir.join(&self.backend_dir).join(format!(
            "{}_{}.{}",
            module.base_name(),
            backend,
            self.extension
        )))
    }
}
