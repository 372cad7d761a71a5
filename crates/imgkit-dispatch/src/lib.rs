//! imgkit Backend Dispatch
//!
//! This crate lets imgkit functions have several interchangeable
//! implementations: the default one plus optional accelerated or alternative
//! backends, selected at call time globally or per call.
//!
//! # Overview
//!
//! Backends are discovered from the package layout:
//!
//! ```text
//! <root>/filters/blur.rs                  default implementation
//! <root>/filters/backend/blur_gpu.rs      "gpu" implementation
//! <root>/filters/backend/blur_opencl.rs   "opencl" implementation
//! ```
//!
//! 1. **Discovery** walks the tree once and records which modules have
//!    backend counterparts and which backend names exist.
//! 2. **Registration** happens when a function is declared eligible. The
//!    first eligible function of a module triggers a static scan of its
//!    backend files to learn which functions each backend provides.
//! 3. **Import** binds a backend's functions through a [`BackendLoader`],
//!    once per (module, backend) pair, when that backend becomes active.
//! 4. **Dispatch** picks the implementation per call, falling back to the
//!    default whenever the requested backend has none.
//!
//! Backend unavailability is never an error. The only dispatch failure is
//! calling a function whose default implementation was never registered.
//!
//! # Crate Structure
//!
//! - [`config`] - Package layout configuration
//! - [`scanner`] - Static extraction of top-level function names
//! - [`discovery`] - Directory-convention backend discovery
//! - [`registry`] - The (module, backend, function) registry
//! - [`loader`] - Backend module loaders
//! - [`dispatch`] - Eligible functions and per-call dispatch
//! - [`context`] - Shared owner of discovery, loader and registry

pub mod config;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod kernel;
pub mod loader;
pub mod names;
pub mod registry;
pub mod scanner;

// Re-export main types at crate root
pub use config::SourceLayout;
pub use context::BackendContext;
pub use discovery::Discovery;
pub use dispatch::{Dispatch, Dispatched, Eligible};
pub use error::{
    CodedError, ConfigError, ContextError, DiscoveryError, DispatchError, LoadError, NameError,
    RegistryError, ScanError,
};
pub use kernel::{BackendModule, Kernel};
pub use loader::{BackendLoader, LoaderTable};
pub use names::{BackendName, Backends, ModulePath};
pub use registry::{BackendRegistry, ImportState, ModuleReport};
