//! Type-erased function values held by the registry.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A callable of any signature, stored without its type.
///
/// A kernel wraps an `Arc<F>`, where `F` is usually a `dyn Fn(..) -> ..`
/// trait object. Dispatch recovers the typed handle with
/// [`Kernel::downcast`], which only succeeds for the exact `F` it was built
/// from.
///
/// ```
/// use imgkit_dispatch::Kernel;
/// use std::sync::Arc;
///
/// type Scale = dyn Fn(f64) -> f64 + Send + Sync;
///
/// let kernel = Kernel::new::<Scale>(Arc::new(|x: f64| x * 2.0));
/// let f = kernel.downcast::<Scale>().unwrap();
/// assert_eq!(f(2.0), 4.0);
/// ```
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Kernel {
    pub fn new<F>(f: Arc<F>) -> Self
    where
        F: ?Sized + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(f),
            type_name: std::any::type_name::<F>(),
        }
    }

    /// Returns the typed function, or `None` if it was built from another type.
    pub fn downcast<F>(&self) -> Option<Arc<F>>
    where
        F: ?Sized + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<Arc<F>>().cloned()
    }

    /// Name of the function type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("type", &self.type_name)
            .finish()
    }
}

/// A materialized backend module: function name to kernel.
#[derive(Debug, Clone, Default)]
pub struct BackendModule {
    functions: BTreeMap<String, Kernel>,
}

impl BackendModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, builder style.
    pub fn with<F>(mut self, name: impl Into<String>, f: Arc<F>) -> Self
    where
        F: ?Sized + Send + Sync + 'static,
    {
        self.insert(name, Kernel::new(f));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, kernel: Kernel) {
        self.functions.insert(name.into(), kernel);
    }

    /// Looks a function up by name.
    pub fn get(&self, name: &str) -> Option<&Kernel> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
