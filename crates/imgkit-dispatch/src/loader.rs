//! Materializing backend modules.
//!
//! The registry never locates backend code by constructed name. Each
//! (module, backend) pair is resolved through a [`BackendLoader`]; the stock
//! [`LoaderTable`] holds one factory per pair.

use crate::error::LoadError;
use crate::kernel::BackendModule;
use crate::names::{BackendName, ModulePath};
use std::collections::HashMap;
use std::fmt;

/// Produces the backend module for a (module, backend) pair.
///
/// A loader is called at most once per pair for the lifetime of a context;
/// failures are remembered and never retried.
pub trait BackendLoader: Send + Sync {
    fn load(&self, module: &ModulePath, backend: &BackendName) -> Result<BackendModule, LoadError>;
}

type Factory = Box<dyn Fn() -> Result<BackendModule, String> + Send + Sync>;

/// Loader backed by a table of registered factories.
#[derive(Default)]
pub struct LoaderTable {
    factories: HashMap<(ModulePath, BackendName), Factory>,
}

impl LoaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `module`'s `backend` counterpart, replacing
    /// any earlier one.
    pub fn register<F>(&mut self, module: ModulePath, backend: BackendName, factory: F)
    where
        F: Fn() -> BackendModule + Send + Sync + 'static,
    {
        self.factories
            .insert((module, backend), Box::new(move || Ok::<_, String>(factory())));
    }

    /// Registers a factory that may fail; its error message becomes
    /// [`LoadError::Failed`].
    pub fn register_fallible<F>(&mut self, module: ModulePath, backend: BackendName, factory: F)
    where
        F: Fn() -> Result<BackendModule, String> + Send + Sync + 'static,
    {
        self.factories.insert((module, backend), Box::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, module: ModulePath, backend: BackendName, factory: F) -> Self
    where
        F: Fn() -> BackendModule + Send + Sync + 'static,
    {
        self.register(module, backend, factory);
        self
    }

    pub fn contains(&self, module: &ModulePath, backend: &BackendName) -> bool {
        self.factories
            .contains_key(&(module.clone(), backend.clone()))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for LoaderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .factories
            .keys()
            .map(|(m, b)| format!("{}:{}", m, b))
            .collect();
        pairs.sort();
        f.debug_struct("LoaderTable").field("pairs", &pairs).finish()
    }
}

impl BackendLoader for LoaderTable {
    fn load(&self, module: &ModulePath, backend: &BackendName) -> Result<BackendModule, LoadError> {
        let factory = self
            .factories
            .get(&(module.clone(), backend.clone()))
            .ok_or_else(|| LoadError::NotFound {
                module: module.to_string(),
                backend: backend.to_string(),
            })?;
        factory().map_err(|message| LoadError::Failed {
            module: module.to_string(),
            backend: backend.to_string(),
            message,
        })
    }
}
