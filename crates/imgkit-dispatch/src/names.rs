//! Module paths, backend names and the discovered backend namespace.

use crate::error::NameError;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Dotted path naming a unit of code, e.g. `imgkit.filters.blur`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModulePath(String);

impl ModulePath {
    /// Parses a dotted path, rejecting empty paths and empty segments.
    pub fn parse(path: impl Into<String>) -> Result<Self, NameError> {
        let path = path.into();
        if path.is_empty() {
            return Err(NameError::EmptyModulePath);
        }
        if path.split('.').any(str::is_empty) {
            return Err(NameError::EmptySegment { path });
        }
        Ok(Self(path))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the dot-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Last segment, the module's own name.
    pub fn base_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Enclosing module, `None` for a single-segment path.
    pub fn parent(&self) -> Option<ModulePath> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| ModulePath(parent.to_string()))
    }

    /// Appends one segment.
    pub fn child(&self, name: &str) -> Result<ModulePath, NameError> {
        ModulePath::parse(format!("{}.{}", self.0, name))
    }

    /// Dotted path of this module's counterpart for `backend`:
    /// `<parent>.<backend_dir>.<base>_<backend>`.
    pub fn backend_module(&self, backend_dir: &str, backend: &BackendName) -> String {
        let leaf = format!("{}_{}", self.base_name(), backend);
        match self.0.rsplit_once('.') {
            Some((parent, _)) => format!("{}.{}.{}", parent, backend_dir, leaf),
            None => format!("{}.{}", backend_dir, leaf),
        }
    }

    /// Whether `self` is `root` or lives underneath it.
    pub fn starts_with(&self, root: &ModulePath) -> bool {
        self.0 == root.0
            || (self.0.starts_with(&root.0) && self.0.as_bytes().get(root.0.len()) == Some(&b'.'))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModulePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Short name of a backend, e.g. `gpu`.
///
/// Names are used as file-name suffixes (`blur_gpu.rs`), so they cannot
/// contain `_` or `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendName(String);

impl BackendName {
    /// Identifier of the reserved default backend.
    pub const DEFAULT: &'static str = "default";

    /// Validates and wraps a backend name.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.contains('_') {
            Some("name contains '_'")
        } else if name.contains('.') {
            Some("name contains '.'")
        } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            Some("name must be ASCII alphanumeric")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(NameError::InvalidBackendName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Wraps a requested name without validation.
    ///
    /// Used for the active backend, which may name a backend that does not
    /// exist; such a name never matches a listing and dispatch falls back.
    pub(crate) fn requested(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved default backend.
    pub fn default_backend() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Whether this is the reserved default backend.
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BackendName {
    fn default() -> Self {
        Self::default_backend()
    }
}

impl fmt::Display for BackendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BackendName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BackendName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for BackendName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BackendName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Backend names found in the package tree.
///
/// Callers use this to refer to backends symbolically instead of with raw
/// strings: `ctx.use_backend(backends.get("gpu").unwrap())`. The default
/// backend is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backends {
    names: BTreeSet<BackendName>,
}

impl Backends {
    /// Namespace holding only the default backend.
    pub fn new() -> Self {
        let mut names = BTreeSet::new();
        names.insert(BackendName::default_backend());
        Self { names }
    }

    /// Adds a name, returning `true` if it was not present yet.
    pub fn insert(&mut self, name: BackendName) -> bool {
        self.names.insert(name)
    }

    /// Looks a backend up by name.
    pub fn get(&self, name: &str) -> Option<&BackendName> {
        self.names.iter().find(|b| b.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Default backend first, then the others in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = &BackendName> {
        let default = self.names.iter().filter(|b| b.is_default());
        default.chain(self.names.iter().filter(|b| !b.is_default()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`: the default backend is never removed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_module_path_parts() {
        let m = ModulePath::parse("imgkit.filters.blur").unwrap();
        assert_eq!(m.base_name(), "blur");
        assert_eq!(m.parent().unwrap().as_str(), "imgkit.filters");
        assert_eq!(
            m.segments().collect::<Vec<_>>(),
            vec!["imgkit", "filters", "blur"]
        );
        assert_eq!(m.child("extra").unwrap().as_str(), "imgkit.filters.blur.extra");
    }

    #[test]
    fn test_module_path_rejects_empty_segments() {
        assert_eq!(ModulePath::parse(""), Err(NameError::EmptyModulePath));
        assert!(matches!(
            ModulePath::parse("imgkit..blur"),
            Err(NameError::EmptySegment { .. })
        ));
        assert!(ModulePath::parse(".blur").is_err());
        assert!(ModulePath::parse("blur.").is_err());
    }

    #[test]
    fn test_backend_module_path() {
        let m = ModulePath::parse("imgkit.filters.blur").unwrap();
        let gpu = BackendName::new("gpu").unwrap();
        assert_eq!(
            m.backend_module("backend", &gpu),
            "imgkit.filters.backend.blur_gpu"
        );

        let top = ModulePath::parse("blur").unwrap();
        assert_eq!(top.backend_module("backend", &gpu), "backend.blur_gpu");
    }

    #[test]
    fn test_starts_with_respects_segment_boundaries() {
        let root = ModulePath::parse("imgkit").unwrap();
        assert!(ModulePath::parse("imgkit.filters").unwrap().starts_with(&root));
        assert!(root.starts_with(&root));
        assert!(!ModulePath::parse("imgkitx.filters").unwrap().starts_with(&root));
    }

    #[test]
    fn test_backend_name_validation() {
        assert!(BackendName::new("gpu").is_ok());
        assert!(BackendName::new("opencl-2").is_ok());
        assert!(BackendName::new("").is_err());
        assert!(BackendName::new("my_gpu").is_err());
        assert!(BackendName::new("gpu.v2").is_err());
        assert!(BackendName::new("gpu!").is_err());
        assert!(BackendName::default().is_default());
    }

    #[test]
    fn test_backends_namespace_orders_default_first() {
        let mut backends = Backends::new();
        assert!(backends.insert(BackendName::new("opencl").unwrap()));
        assert!(backends.insert(BackendName::new("cuda").unwrap()));
        assert!(!backends.insert(BackendName::new("cuda").unwrap()));

        let names: Vec<_> = backends.iter().map(BackendName::as_str).collect();
        assert_eq!(names, vec!["default", "cuda", "opencl"]);
        assert_eq!(backends.len(), 3);
        assert!(backends.contains("cuda"));
        assert!(backends.get("gpu").is_none());
    }
}
