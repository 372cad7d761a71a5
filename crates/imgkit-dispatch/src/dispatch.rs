//! Per-call backend selection for eligible functions.
//!
//! A function becomes eligible by handing an [`Eligible`] definition to
//! [`BackendContext::eligible`]. The returned [`Dispatched`] wrapper resolves
//! the implementation on every call: an explicit per-call backend wins,
//! otherwise the context's active backend is used, and anything the chosen
//! backend does not implement runs the default implementation.
//!
//! # Example
//!
//! ```ignore
//! use imgkit_dispatch::{BackendContext, Eligible, SourceLayout, LoaderTable};
//! use std::sync::Arc;
//!
//! type Gaussian = dyn Fn(&Image, f64) -> Image + Send + Sync;
//!
//! let ctx = BackendContext::new(SourceLayout::new("imgkit", "src/imgkit"), loaders)?;
//! let gaussian = ctx.eligible(Eligible::<Gaussian>::new(
//!     "imgkit.filters.blur",
//!     "gaussian",
//!     Arc::new(gaussian_default),
//! ))?;
//!
//! ctx.use_backend("gpu");
//! let out = gaussian.call(|f| f(&image, 1.5))?;          // gpu if available
//! let out = gaussian.call_with("default", |f| f(&image, 1.5))?; // this call only
//! ```

use crate::context::BackendContext;
use crate::error::DispatchError;
use crate::names::{BackendName, ModulePath};
use crate::registry::BackendRegistry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A function declared as supporting backend dispatch.
pub struct Eligible<F: ?Sized> {
    pub(crate) module: String,
    pub(crate) name: String,
    pub(crate) implementation: Arc<F>,
    pub(crate) description: String,
    pub(crate) backends: Vec<String>,
}

impl<F> Eligible<F>
where
    F: ?Sized + Send + Sync + 'static,
{
    /// `implementation` becomes the default backend's version of
    /// `module.name`.
    pub fn new(module: impl Into<String>, name: impl Into<String>, implementation: Arc<F>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            implementation,
            description: String::new(),
            backends: Vec::new(),
        }
    }

    /// Human-readable description; the generated backend list is appended
    /// to it.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Backends the author expects to exist. Informational only.
    pub fn backends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backends = names.into_iter().map(Into::into).collect();
        self
    }
}

impl<F: ?Sized> fmt::Debug for Eligible<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eligible")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("backends", &self.backends)
            .finish_non_exhaustive()
    }
}

/// Resolves the implementation to run for one call.
pub trait Dispatch {
    /// Function type of every implementation.
    type Target: ?Sized;

    /// Implementation for `backend`, or for the active backend when `None`.
    fn resolve(&self, backend: Option<&str>) -> Result<Arc<Self::Target>, DispatchError>;
}

/// Wrapper around an eligible function that picks its backend per call.
pub struct Dispatched<F: ?Sized> {
    context: Arc<BackendContext>,
    module: ModulePath,
    name: String,
    description: String,
    declared_backends: Vec<String>,
    _signature: PhantomData<fn() -> Arc<F>>,
}

impl<F> Dispatched<F>
where
    F: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(
        context: Arc<BackendContext>,
        module: ModulePath,
        name: String,
        description: String,
        declared_backends: Vec<String>,
    ) -> Self {
        Self {
            context,
            module,
            name,
            description,
            declared_backends,
            _signature: PhantomData,
        }
    }

    /// Runs `invoke` with the implementation for the active backend.
    ///
    /// Whatever `invoke` returns is passed through unchanged.
    pub fn call<R>(&self, invoke: impl FnOnce(&F) -> R) -> Result<R, DispatchError> {
        let f = self.resolve(None)?;
        Ok(invoke(&*f))
    }

    /// Runs `invoke` with the implementation for `backend`, for this call
    /// only.
    pub fn call_with<R>(
        &self,
        backend: impl AsRef<str>,
        invoke: impl FnOnce(&F) -> R,
    ) -> Result<R, DispatchError> {
        let f = self.resolve(Some(backend.as_ref()))?;
        Ok(invoke(&*f))
    }

    pub fn module(&self) -> &ModulePath {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description including the generated list of supported backends.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Backends listed on the definition.
    pub fn declared_backends(&self) -> &[String] {
        &self.declared_backends
    }

    /// Dotted path of `backend`'s implementation of this function.
    pub fn qualified_name(&self, backend: &BackendName) -> String {
        self.context
            .function_qualified_name(&self.module, &self.name, backend)
    }
}

impl<F> Dispatch for Dispatched<F>
where
    F: ?Sized + Send + Sync + 'static,
{
    type Target = F;

    fn resolve(&self, backend: Option<&str>) -> Result<Arc<F>, DispatchError> {
        let registry = self.context.registry();
        let requested = backend.unwrap_or(registry.active().as_str());
        let resolved = registry.resolve(&self.module, &self.name, requested)?;

        if let Some(f) = resolved.kernel.downcast::<F>() {
            tracing::trace!(
                module = %self.module,
                function = %self.name,
                requested,
                backend = %resolved.backend,
                "dispatch"
            );
            return Ok(f);
        }

        if !resolved.backend.is_default() {
            tracing::warn!(
                module = %self.module,
                function = %self.name,
                backend = %resolved.backend,
                found = resolved.kernel.type_name(),
                "backend implementation has a different signature, using default"
            );
            let default = registry.resolve_default(&self.module, &self.name)?;
            if let Some(f) = default.kernel.downcast::<F>() {
                return Ok(f);
            }
        }

        Err(DispatchError::SignatureMismatch {
            module: self.module.to_string(),
            function: self.name.clone(),
        })
    }
}

impl<F: ?Sized> Clone for Dispatched<F> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            module: self.module.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            declared_backends: self.declared_backends.clone(),
            _signature: PhantomData,
        }
    }
}

impl<F: ?Sized> fmt::Debug for Dispatched<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("module", &self.module)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Documentation block listing every backend of `module` and where its
/// version of `function` lives. `None` when the module only has the default.
pub(crate) fn backend_doc_block(
    registry: &BackendRegistry,
    module: &ModulePath,
    function: &str,
) -> Option<String> {
    let backends = registry.backends_for(module);
    if backends.len() <= 1 {
        return None;
    }
    let mut block = String::from("Backends supported:\n-------------------\n");
    for backend in &backends {
        block.push_str(&format!(
            "{}\n   See also: {}\n",
            backend,
            registry.function_qualified_name(module, function, backend)
        ));
    }
    Some(block)
}
