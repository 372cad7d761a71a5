//! The backend context: discovery results, loader and registry in one place.
//!
//! A context plays the role of the process-wide backend manager. Code that
//! wants a single global instance keeps one `Arc<BackendContext>` in a
//! static; tests build a fresh context each.

use crate::config::SourceLayout;
use crate::discovery::{self, Discovery};
use crate::dispatch::{backend_doc_block, Dispatched, Eligible};
use crate::error::{ContextError, DispatchError, RegistryError};
use crate::kernel::Kernel;
use crate::loader::BackendLoader;
use crate::names::{BackendName, Backends, ModulePath};
use crate::registry::{BackendRegistry, ModuleReport, Resolved};
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;

/// Shared owner of the backend registry.
///
/// Every mutation (switching backends, registering functions) takes the
/// registry's write lock for its whole duration, so a dispatch never sees a
/// backend whose functions are only partly bound.
pub struct BackendContext {
    discovery: Discovery,
    loader: Box<dyn BackendLoader>,
    registry: RwLock<BackendRegistry>,
}

impl BackendContext {
    /// Validates `layout`, scans the package tree and seeds the registry.
    ///
    /// # Errors
    ///
    /// Fails if the layout is invalid or the package root cannot be listed.
    pub fn new<L>(layout: SourceLayout, loader: L) -> Result<Arc<Self>, ContextError>
    where
        L: BackendLoader + 'static,
    {
        layout.validate()?;
        let discovery = discovery::scan(&layout)?;
        Ok(Self::from_discovery(layout, discovery, loader))
    }

    /// Builds a context from an existing discovery result.
    pub fn from_discovery<L>(layout: SourceLayout, discovery: Discovery, loader: L) -> Arc<Self>
    where
        L: BackendLoader + 'static,
    {
        let registry = BackendRegistry::from_discovery(layout, &discovery);
        Arc::new(Self {
            discovery,
            loader: Box::new(loader),
            registry: RwLock::new(registry),
        })
    }

    /// Backend names found by discovery, default included.
    pub fn backends(&self) -> &Backends {
        self.discovery.backends()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Switches the active backend for every later dispatch.
    ///
    /// Unknown names are accepted; dispatch then always uses the default.
    pub fn use_backend(&self, name: impl AsRef<str>) {
        self.registry
            .write()
            .use_backend(name.as_ref(), self.loader.as_ref());
    }

    pub fn active_backend(&self) -> BackendName {
        self.registry.read().active().clone()
    }

    /// Registers an eligible function and returns its dispatching wrapper.
    ///
    /// # Errors
    ///
    /// Fails if the module path or function name is malformed, or if a
    /// backend file of the module cannot be read or parsed.
    pub fn eligible<F>(self: &Arc<Self>, def: Eligible<F>) -> Result<Dispatched<F>, RegistryError>
    where
        F: ?Sized + Send + Sync + 'static,
    {
        let Eligible {
            module,
            name,
            implementation,
            description,
            backends,
        } = def;
        let module = ModulePath::parse(module)?;

        let description = {
            let mut registry = self.registry.write();
            registry.register_function(
                &module,
                &name,
                Kernel::new(implementation),
                self.loader.as_ref(),
            )?;
            match backend_doc_block(&registry, &module, &name) {
                Some(block) if description.is_empty() => block,
                Some(block) => format!("{}\n{}", description, block),
                None => description,
            }
        };

        Ok(Dispatched::new(
            Arc::clone(self),
            module,
            name,
            description,
            backends,
        ))
    }

    /// Resolves `module.function` for `backend`, or the active backend.
    pub fn resolve(
        &self,
        module: &ModulePath,
        function: &str,
        backend: Option<&str>,
    ) -> Result<Resolved, DispatchError> {
        let registry = self.registry.read();
        let backend = backend.unwrap_or(registry.active().as_str());
        registry.resolve(module, function, backend)
    }

    pub fn function_qualified_name(
        &self,
        module: &ModulePath,
        function: &str,
        backend: &BackendName,
    ) -> String {
        self.registry
            .read()
            .function_qualified_name(module, function, backend)
    }

    /// Snapshot of the registry state for `module`.
    pub fn inspect(&self, module: &ModulePath) -> Option<ModuleReport> {
        self.registry.read().inspect(module)
    }

    pub(crate) fn registry(&self) -> RwLockReadGuard<'_, BackendRegistry> {
        self.registry.read()
    }
}

impl fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendContext")
            .field("discovery", &self.discovery)
            .field("registry", &*self.registry.read())
            .finish_non_exhaustive()
    }
}
