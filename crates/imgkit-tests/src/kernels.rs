//! Stand-in image kernels and loaders for dispatch tests.

use imgkit_dispatch::{BackendLoader, BackendModule, BackendName, LoadError, LoaderTable, ModulePath};
use std::collections::BTreeMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Minimal grayscale image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f32>,
    /// Name of the implementation that last produced this image.
    pub produced_by: &'static str,
}

impl Image {
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
            produced_by: "input",
        }
    }
}

/// Signature shared by every filter in these tests.
pub type Filter = dyn Fn(&Image, f32) -> Image + Send + Sync;

/// Builds a filter that scales pixels and tags the output with `label`.
pub fn filter(label: &'static str, factor: f32) -> Arc<Filter> {
    Arc::new(move |image: &Image, strength: f32| Image {
        width: image.width,
        height: image.height,
        pixels: image.pixels.iter().map(|p| p * factor * strength).collect(),
        produced_by: label,
    })
}

/// Loader that records every load attempt per (module, backend) pair.
#[derive(Default)]
pub struct CountingLoader {
    table: LoaderTable,
    loads: Mutex<BTreeMap<(String, String), usize>>,
}

impl CountingLoader {
    pub fn new(table: LoaderTable) -> Self {
        Self {
            table,
            loads: Mutex::new(BTreeMap::new()),
        }
    }

    /// Shares the counters so a test can read them after handing the loader
    /// to a context.
    pub fn shared(table: LoaderTable) -> (SharedLoader, Arc<CountingLoader>) {
        let inner = Arc::new(Self::new(table));
        (SharedLoader(Arc::clone(&inner)), inner)
    }

    /// How often `module`'s `backend` was loaded.
    pub fn loads(&self, module: &str, backend: &str) -> usize {
        self.loads
            .lock()
            .get(&(module.to_string(), backend.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.loads.lock().values().sum()
    }
}

impl BackendLoader for CountingLoader {
    fn load(&self, module: &ModulePath, backend: &BackendName) -> Result<BackendModule, LoadError> {
        *self
            .loads
            .lock()
            .entry((module.to_string(), backend.to_string()))
            .or_insert(0) += 1;
        self.table.load(module, backend)
    }
}

/// Handle passing a shared [`CountingLoader`] into a context.
pub struct SharedLoader(Arc<CountingLoader>);

impl BackendLoader for SharedLoader {
    fn load(&self, module: &ModulePath, backend: &BackendName) -> Result<BackendModule, LoadError> {
        self.0.load(module, backend)
    }
}

/// Module path helper that panics on malformed input.
pub fn module(path: &str) -> ModulePath {
    ModulePath::parse(path).expect("valid module path")
}

/// Backend name helper that panics on malformed input.
pub fn backend(name: &str) -> BackendName {
    BackendName::new(name).expect("valid backend name")
}
