//! Error types for backend discovery, registration and dispatch.

use std::path::PathBuf;
use thiserror::Error;

/// Common trait for dispatch-layer errors.
///
/// Every error enum in this crate implements this trait so callers can report
/// failures with a stable code regardless of which component raised them.
///
/// # Example
///
/// ```ignore
/// use imgkit_dispatch::error::CodedError;
///
/// fn report<E: CodedError>(err: &E) {
///     eprintln!("[{}] {}", err.code(), err.message());
/// }
/// ```
pub trait CodedError: std::error::Error {
    /// Stable error code such as `"SCAN_001"` or `"DISPATCH_002"`.
    fn code(&self) -> &'static str;

    /// Human-readable message, normally the `Display` output.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Error category: "name", "config", "scan", "discovery", "load",
    /// "registry" or "dispatch".
    fn category(&self) -> &'static str;
}

/// Invalid module or backend identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Module path was empty.
    #[error("module path is empty")]
    EmptyModulePath,

    /// Module path contained an empty segment (`a..b`, `.a`, `a.`).
    #[error("module path '{path}' contains an empty segment")]
    EmptySegment {
        /// The offending path.
        path: String,
    },

    /// Backend name is not usable as a file-name suffix.
    #[error("invalid backend name '{name}': {reason}")]
    InvalidBackendName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl CodedError for NameError {
    fn code(&self) -> &'static str {
        match self {
            NameError::EmptyModulePath => "NAME_001",
            NameError::EmptySegment { .. } => "NAME_002",
            NameError::InvalidBackendName { .. } => "NAME_003",
        }
    }

    fn category(&self) -> &'static str {
        "name"
    }
}

/// Errors loading or validating a [`SourceLayout`](crate::SourceLayout).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read layout config {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration was not valid JSON for a layout.
    #[error("failed to parse layout config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the layout cannot work with.
    #[error("invalid layout field '{field}': {message}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Root package is not a valid module path.
    #[error(transparent)]
    Name(#[from] NameError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl CodedError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_001",
            ConfigError::Parse(_) => "CONFIG_002",
            ConfigError::Invalid { .. } => "CONFIG_003",
            ConfigError::Name(_) => "CONFIG_004",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}

/// Source text of a backend file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}parse error at {line}:{column}: {message}", .path.as_ref().map(|p| format!("{}: ", p.display())).unwrap_or_default())]
pub struct ScanError {
    /// File the text came from, when known.
    pub path: Option<PathBuf>,
    /// 1-based line of the first syntax error.
    pub line: usize,
    /// 0-based column of the first syntax error.
    pub column: usize,
    /// Parser message.
    pub message: String,
}

impl ScanError {
    /// Attaches the path of the scanned file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl CodedError for ScanError {
    fn code(&self) -> &'static str {
        "SCAN_001"
    }

    fn category(&self) -> &'static str {
        "scan"
    }
}

/// Errors walking the package tree.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The package root could not be listed.
    #[error("failed to read package root {path}: {source}")]
    ReadRoot {
        /// Root directory.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The package root does not exist or is not a directory.
    #[error("package root {0} is not a directory")]
    NotADirectory(PathBuf),

    /// Layout names an invalid root package.
    #[error(transparent)]
    Layout(#[from] ConfigError),
}

impl CodedError for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            DiscoveryError::ReadRoot { .. } => "DISCOVERY_001",
            DiscoveryError::NotADirectory(_) => "DISCOVERY_002",
            DiscoveryError::Layout(e) => e.code(),
        }
    }

    fn category(&self) -> &'static str {
        "discovery"
    }
}

/// A backend module could not be materialized.
///
/// Load errors never reach callers of `use_backend` or registration; the
/// registry records the failure and keeps dispatching to the default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// No loader knows this (module, backend) pair.
    #[error("backend module {module} for backend '{backend}' not found")]
    NotFound {
        /// Module path of the default implementation.
        module: String,
        /// Requested backend.
        backend: String,
    },

    /// The loader found the module but could not build it.
    #[error("failed to load backend '{backend}' for {module}: {message}")]
    Failed {
        /// Module path of the default implementation.
        module: String,
        /// Requested backend.
        backend: String,
        /// Loader-specific message.
        message: String,
    },
}

impl CodedError for LoadError {
    fn code(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "LOAD_001",
            LoadError::Failed { .. } => "LOAD_002",
        }
    }

    fn category(&self) -> &'static str {
        "load"
    }
}

/// Errors raised while registering an eligible function.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A backend file of the module is not valid source.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A backend file recorded by discovery could not be read.
    #[error("failed to read backend file {path}: {source}")]
    ReadBackendFile {
        /// Expected location of the backend file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Module path or function name was malformed.
    #[error(transparent)]
    Name(#[from] NameError),

    /// Function name is not a plain identifier.
    #[error("invalid function name '{0}'")]
    InvalidFunctionName(String),
}

impl From<crate::scanner::ScanFileError> for RegistryError {
    fn from(err: crate::scanner::ScanFileError) -> Self {
        match err {
            crate::scanner::ScanFileError::Read { path, source } => {
                RegistryError::ReadBackendFile { path, source }
            }
            crate::scanner::ScanFileError::Parse(e) => RegistryError::Scan(e),
        }
    }
}

impl CodedError for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            RegistryError::Scan(_) => "REGISTRY_001",
            RegistryError::ReadBackendFile { .. } => "REGISTRY_002",
            RegistryError::Name(_) => "REGISTRY_003",
            RegistryError::InvalidFunctionName(_) => "REGISTRY_004",
        }
    }

    fn category(&self) -> &'static str {
        "registry"
    }
}

/// Dispatch could not find any implementation to call.
///
/// This is a programming error: the default implementation is always present
/// once a function went through registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The module was never registered.
    #[error("module {module} is not registered for dispatch")]
    UnknownModule {
        /// Module path.
        module: String,
    },

    /// The module is known but has no default implementation of the function.
    #[error("no default implementation of {module}.{function}")]
    MissingDefault {
        /// Module path.
        module: String,
        /// Function name.
        function: String,
    },

    /// The default implementation has a different signature than requested.
    #[error("default implementation of {module}.{function} has a different signature")]
    SignatureMismatch {
        /// Module path.
        module: String,
        /// Function name.
        function: String,
    },
}

impl CodedError for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownModule { .. } => "DISPATCH_001",
            DispatchError::MissingDefault { .. } => "DISPATCH_002",
            DispatchError::SignatureMismatch { .. } => "DISPATCH_003",
        }
    }

    fn category(&self) -> &'static str {
        "dispatch"
    }
}

/// Errors building a [`BackendContext`](crate::BackendContext).
#[derive(Debug, Error)]
pub enum ContextError {
    /// Layout failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Package tree could not be scanned.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl CodedError for ContextError {
    fn code(&self) -> &'static str {
        match self {
            ContextError::Config(e) => e.code(),
            ContextError::Discovery(e) => e.code(),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            ContextError::Config(e) => e.category(),
            ContextError::Discovery(e) => e.category(),
        }
    }
}
