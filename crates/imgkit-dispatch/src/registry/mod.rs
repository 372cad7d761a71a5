//! The backend registry.
//!
//! The registry maps `(module, backend, function)` to a kernel. An entry of
//! `None` means the function is declared (found by scanning a backend file)
//! but not bound yet. Alongside the listing, every (module, backend) pair has
//! an [`ImportState`]; the default backend of every module is always
//! [`ImportState::Imported`] because its kernels are the ones callers
//! register.
//!
//! # Lifecycle
//!
//! 1. Discovery seeds a skeleton: each module gets an empty default entry
//!    and one empty, pending entry per discovered backend.
//! 2. The first eligible function of a module triggers a scan of all its
//!    backend files, filling in the declared function names.
//! 3. Switching the active backend, or registering while a non-default
//!    backend is active, imports that backend once per module and binds
//!    every declared function found in the loaded module.

use crate::config::SourceLayout;
use crate::discovery::Discovery;
use crate::error::{DispatchError, RegistryError};
use crate::kernel::Kernel;
use crate::loader::BackendLoader;
use crate::names::{BackendName, ModulePath};
use crate::scanner;
use std::collections::BTreeMap;

/// Whether a backend module has been materialized for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    /// Not loaded yet.
    Pending,
    /// Loaded and its functions bound.
    Imported,
    /// Loading failed; it is not retried.
    Failed,
}

#[derive(Debug, Clone)]
struct BackendListing {
    functions: BTreeMap<String, Option<Kernel>>,
    state: ImportState,
}

impl BackendListing {
    fn new(state: ImportState) -> Self {
        Self {
            functions: BTreeMap::new(),
            state,
        }
    }
}

#[derive(Debug, Clone)]
struct ModuleListing {
    backends: BTreeMap<BackendName, BackendListing>,
    scanned: bool,
}

impl ModuleListing {
    fn new() -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(
            BackendName::default_backend(),
            BackendListing::new(ImportState::Imported),
        );
        Self {
            backends,
            scanned: false,
        }
    }

    fn default_listing(&self) -> Option<&BackendListing> {
        self.backends.get(BackendName::DEFAULT)
    }

    fn default_listing_mut(&mut self) -> &mut BackendListing {
        self.backends
            .entry(BackendName::default_backend())
            .or_insert_with(|| BackendListing::new(ImportState::Imported))
    }
}

/// Outcome of resolving a call: the backend that will run and its kernel.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub backend: BackendName,
    pub kernel: Kernel,
}

/// Registry state for one module, as reported by [`BackendRegistry::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub module: ModulePath,
    /// Whether the module's backend files have been scanned.
    pub scanned: bool,
    /// Default backend first.
    pub backends: Vec<BackendReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReport {
    pub backend: BackendName,
    pub state: ImportState,
    /// Declared functions and whether each is bound.
    pub functions: Vec<(String, bool)>,
}

/// Mapping from (module, backend) to the functions implemented there.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    layout: SourceLayout,
    active: BackendName,
    modules: BTreeMap<ModulePath, ModuleListing>,
}

impl BackendRegistry {
    /// Empty registry with the default backend active.
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            active: BackendName::default_backend(),
            modules: BTreeMap::new(),
        }
    }

    /// Registry seeded with the skeleton of every discovered module.
    pub fn from_discovery(layout: SourceLayout, discovery: &Discovery) -> Self {
        let mut registry = Self::new(layout);
        for (module, backends) in discovery.modules() {
            let listing = registry
                .modules
                .entry(module.clone())
                .or_insert_with(ModuleListing::new);
            for backend in backends {
                listing
                    .backends
                    .entry(backend.clone())
                    .or_insert_with(|| BackendListing::new(ImportState::Pending));
            }
        }
        registry
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Currently active backend.
    pub fn active(&self) -> &BackendName {
        &self.active
    }

    /// Makes `name` the active backend and imports it for every module whose
    /// backend files were already scanned.
    ///
    /// The name is not checked against the discovered backends; an unknown
    /// name makes every dispatch fall back to the default. Modules that are
    /// only known from discovery are imported when their first function
    /// registers.
    pub fn use_backend(&mut self, name: &str, loader: &dyn BackendLoader) {
        self.active = BackendName::requested(name);
        tracing::debug!(backend = name, "switching active backend");
        if self.active.is_default() {
            return;
        }
        for (module, listing) in self.modules.iter_mut() {
            if !listing.scanned {
                continue;
            }
            if let Some(entry) = listing.backends.get_mut(name) {
                import_backend(module, &self.active, entry, loader);
            }
        }
    }

    /// Registers `kernel` as the default implementation of
    /// `module.function`.
    ///
    /// The first registration in a module scans every backend file declared
    /// for it; later registrations reuse that scan. If a non-default backend
    /// is active and declared for the module, it is imported now.
    ///
    /// # Errors
    ///
    /// Fails if a backend file cannot be read or parsed. The registry is left
    /// untouched in that case.
    pub fn register_function(
        &mut self,
        module: &ModulePath,
        function: &str,
        kernel: Kernel,
        loader: &dyn BackendLoader,
    ) -> Result<(), RegistryError> {
        if syn::parse_str::<syn::Ident>(function).is_err() {
            return Err(RegistryError::InvalidFunctionName(function.to_string()));
        }

        let needs_scan = self.modules.get(module).map_or(true, |l| !l.scanned);
        let declared = if needs_scan {
            self.scan_backend_functions(module)?
        } else {
            Vec::new()
        };

        let listing = self
            .modules
            .entry(module.clone())
            .or_insert_with(ModuleListing::new);
        if needs_scan {
            for (backend, names) in declared {
                if let Some(entry) = listing.backends.get_mut(&backend) {
                    for name in names {
                        entry.functions.entry(name).or_insert(None);
                    }
                }
            }
            listing.scanned = true;
        }

        listing
            .default_listing_mut()
            .functions
            .insert(function.to_string(), Some(kernel));
        tracing::debug!(module = %module, function, "registered eligible function");

        if !self.active.is_default() {
            if let Some(entry) = listing.backends.get_mut(self.active.as_str()) {
                import_backend(module, &self.active, entry, loader);
            }
        }
        Ok(())
    }

    /// Reads and scans every backend file declared for `module`.
    fn scan_backend_functions(
        &self,
        module: &ModulePath,
    ) -> Result<Vec<(BackendName, Vec<String>)>, RegistryError> {
        let Some(listing) = self.modules.get(module) else {
            return Ok(Vec::new());
        };
        let mut declared = Vec::new();
        for backend in listing.backends.keys().filter(|b| !b.is_default()) {
            let Some(path) = self.layout.backend_file(module, backend) else {
                continue;
            };
            let names = scanner::parse_file(&path)?;
            declared.push((backend.clone(), names));
        }
        Ok(declared)
    }

    /// Picks the kernel for a call.
    ///
    /// Uses `listing[module][backend][function]` when it is bound, otherwise
    /// the default implementation. Unknown backends and unimplemented
    /// functions fall back silently.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] if the module or its default implementation of
    /// `function` was never registered.
    pub fn resolve(
        &self,
        module: &ModulePath,
        function: &str,
        backend: &str,
    ) -> Result<Resolved, DispatchError> {
        let listing = self
            .modules
            .get(module)
            .ok_or_else(|| DispatchError::UnknownModule {
                module: module.to_string(),
            })?;

        let bound = listing
            .backends
            .get_key_value(backend)
            .and_then(|(name, entry)| {
                let kernel = entry.functions.get(function)?.as_ref()?;
                Some(Resolved {
                    backend: name.clone(),
                    kernel: kernel.clone(),
                })
            });
        if let Some(resolved) = bound {
            return Ok(resolved);
        }

        self.resolve_default(module, function)
    }

    /// The default implementation of `module.function`.
    pub fn resolve_default(
        &self,
        module: &ModulePath,
        function: &str,
    ) -> Result<Resolved, DispatchError> {
        let listing = self
            .modules
            .get(module)
            .ok_or_else(|| DispatchError::UnknownModule {
                module: module.to_string(),
            })?;
        listing
            .default_listing()
            .and_then(|entry| entry.functions.get(function))
            .and_then(Option::as_ref)
            .map(|kernel| Resolved {
                backend: BackendName::default_backend(),
                kernel: kernel.clone(),
            })
            .ok_or_else(|| DispatchError::MissingDefault {
                module: module.to_string(),
                function: function.to_string(),
            })
    }

    /// Dotted path where `backend`'s implementation of `module.function`
    /// lives. The default implementation lives in the module itself.
    pub fn function_qualified_name(
        &self,
        module: &ModulePath,
        function: &str,
        backend: &BackendName,
    ) -> String {
        if backend.is_default() {
            format!("{}.{}", module, function)
        } else {
            format!(
                "{}.{}",
                module.backend_module(&self.layout.backend_dir, backend),
                function
            )
        }
    }

    /// Known modules, in path order.
    pub fn modules(&self) -> impl Iterator<Item = &ModulePath> {
        self.modules.keys()
    }

    pub fn contains_module(&self, module: &ModulePath) -> bool {
        self.modules.contains_key(module)
    }

    /// Backends declared for `module`, default first. Empty for unknown
    /// modules.
    pub fn backends_for(&self, module: &ModulePath) -> Vec<BackendName> {
        let Some(listing) = self.modules.get(module) else {
            return Vec::new();
        };
        let mut backends = vec![BackendName::default_backend()];
        backends.extend(listing.backends.keys().filter(|b| !b.is_default()).cloned());
        backends
    }

    /// Import state of a (module, backend) pair, `None` if the pair is not
    /// declared.
    pub fn import_state(&self, module: &ModulePath, backend: &str) -> Option<ImportState> {
        self.modules
            .get(module)?
            .backends
            .get(backend)
            .map(|entry| entry.state)
    }

    /// Whether the pair has been imported and its functions bound.
    pub fn is_imported(&self, module: &ModulePath, backend: &str) -> bool {
        self.import_state(module, backend) == Some(ImportState::Imported)
    }

    /// Whether `module`'s backend files have been scanned.
    pub fn is_scanned(&self, module: &ModulePath) -> bool {
        self.modules.get(module).is_some_and(|l| l.scanned)
    }

    /// Declared functions of a (module, backend) pair and whether each is
    /// bound.
    pub fn listing(&self, module: &ModulePath, backend: &str) -> Option<Vec<(String, bool)>> {
        let entry = self.modules.get(module)?.backends.get(backend)?;
        Some(
            entry
                .functions
                .iter()
                .map(|(name, kernel)| (name.clone(), kernel.is_some()))
                .collect(),
        )
    }

    /// Snapshot of everything the registry knows about `module`.
    pub fn inspect(&self, module: &ModulePath) -> Option<ModuleReport> {
        let listing = self.modules.get(module)?;
        let backends = self
            .backends_for(module)
            .into_iter()
            .filter_map(|backend| {
                let entry = listing.backends.get(&backend)?;
                Some(BackendReport {
                    state: entry.state,
                    functions: entry
                        .functions
                        .iter()
                        .map(|(name, kernel)| (name.clone(), kernel.is_some()))
                        .collect(),
                    backend,
                })
            })
            .collect();
        Some(ModuleReport {
            module: module.clone(),
            scanned: listing.scanned,
            backends,
        })
    }
}

/// Loads `backend` for `module` if it is still pending and binds every
/// declared function the loaded module provides.
fn import_backend(
    module: &ModulePath,
    backend: &BackendName,
    entry: &mut BackendListing,
    loader: &dyn BackendLoader,
) {
    if entry.state != ImportState::Pending {
        return;
    }
    match loader.load(module, backend) {
        Ok(loaded) => {
            let mut bound = 0usize;
            for (name, slot) in entry.functions.iter_mut() {
                match loaded.get(name) {
                    Some(kernel) => {
                        *slot = Some(kernel.clone());
                        bound += 1;
                    }
                    None => tracing::warn!(
                        module = %module,
                        backend = %backend,
                        function = %name,
                        "declared backend function missing from loaded module"
                    ),
                }
            }
            entry.state = ImportState::Imported;
            tracing::debug!(module = %module, backend = %backend, bound, "imported backend");
        }
        Err(err) => {
            entry.state = ImportState::Failed;
            tracing::warn!(
                module = %module,
                backend = %backend,
                error = %err,
                "backend unavailable, dispatch falls back to default"
            );
        }
    }
}
