//! Test fixture utilities for creating synthetic package trees.

use imgkit_dispatch::SourceLayout;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Root package name used by every fixture.
pub const ROOT_PACKAGE: &str = "imgkit";

/// A throwaway package tree: `<root>/<submodule>/<module>.rs` plus
/// `<root>/<submodule>/backend/<module>_<backend>.rs` files.
pub struct PackageFixture {
    pub root: TempDir,
}

impl PackageFixture {
    /// Create a new empty package.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        Self { root }
    }

    /// Get the package root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Layout pointing at this package with the default conventions.
    pub fn layout(&self) -> SourceLayout {
        SourceLayout::new(ROOT_PACKAGE, self.path())
    }

    /// Add a default module source file.
    ///
    /// # Arguments
    /// * `submodule` - Directory directly under the root (filters, morphology, ...)
    /// * `module` - File name without extension
    /// * `functions` - Top-level functions to declare in the file
    pub fn add_module(&self, submodule: &str, module: &str, functions: &[&str]) -> PathBuf {
        let path = self.path().join(submodule).join(format!("{}.rs", module));
        write_source(&path, functions);
        path
    }

    /// Add a backend file for `module` declaring `functions`.
    pub fn add_backend(
        &self,
        submodule: &str,
        module: &str,
        backend: &str,
        functions: &[&str],
    ) -> PathBuf {
        let path = self.backend_path(submodule, module, backend);
        write_source(&path, functions);
        path
    }

    /// Add a backend file with arbitrary content.
    pub fn add_backend_source(
        &self,
        submodule: &str,
        module: &str,
        backend: &str,
        content: &str,
    ) -> PathBuf {
        let path = self.backend_path(submodule, module, backend);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create backend dir");
        fs::write(&path, content).expect("Failed to write backend file");
        path
    }

    /// Write a JSON layout config next to the package and return its path.
    pub fn write_layout_config(&self, file_name: &str) -> PathBuf {
        let config = serde_json::json!({
            "root_package": ROOT_PACKAGE,
            "root_dir": ".",
        });
        let path = self.path().join(file_name);
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap())
            .expect("Failed to write layout config");
        path
    }

    fn backend_path(&self, submodule: &str, module: &str, backend: &str) -> PathBuf {
        self.path()
            .join(submodule)
            .join("backend")
            .join(format!("{}_{}.rs", module, backend))
    }
}

impl Default for PackageFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_source(path: &Path, functions: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create module dir");
    let mut content = String::from("// generated test fixture\n\n");
    for function in functions {
        content.push_str(&format!(
            "pub fn {}(image: &Image) -> Image {{\n    image.clone()\n}}\n\n",
            function
        ));
    }
    fs::write(path, content).expect("Failed to write source file");
}
