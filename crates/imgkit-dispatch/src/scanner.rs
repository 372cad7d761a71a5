//! Static extraction of function names from backend source files.
//!
//! Backend files are parsed, never compiled or executed: macros are not
//! expanded and nothing in the file runs. Only top-level `fn` items count.

use crate::error::ScanError;
use std::fs;
use std::path::Path;
use syn::Item;

/// Returns the names of the top-level functions defined in `source`, in the
/// order they appear.
///
/// Functions nested in inline modules, `impl` blocks or other function bodies
/// are not reported.
///
/// # Errors
///
/// Returns [`ScanError`] if `source` is not syntactically valid.
pub fn parse(source: &str) -> Result<Vec<String>, ScanError> {
    let file = syn::parse_file(source).map_err(|err| {
        let start = err.span().start();
        ScanError {
            path: None,
            line: start.line,
            column: start.column,
            message: err.to_string(),
        }
    })?;

    Ok(file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Fn(func) => Some(func.sig.ident.to_string()),
            _ => None,
        })
        .collect())
}

/// Reads `path` and scans it with [`parse`].
pub fn parse_file(path: &Path) -> Result<Vec<String>, ScanFileError> {
    let source = fs::read_to_string(path).map_err(|source| ScanFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let functions = parse(&source).map_err(|e| e.with_path(path))?;
    tracing::debug!(path = %path.display(), count = functions.len(), "scanned backend file");
    Ok(functions)
}

/// Failure reading or parsing a backend file.
#[derive(Debug, thiserror::Error)]
pub enum ScanFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ScanError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_level_functions_in_order() {
        let source = r#"
            use crate::image::Image;

            pub fn gaussian(img: &Image, sigma: f64) -> Image {
                img.clone()
            }

            fn helper() {}

            pub(crate) unsafe fn median() {}

            const RADIUS: usize = 3;
        "#;
        assert_eq!(parse(source).unwrap(), vec!["gaussian", "helper", "median"]);
    }

    #[test]
    fn test_nested_definitions_are_skipped() {
        let source = r#"
            pub fn outer() {
                fn inner() {}
                inner();
            }

            mod detail {
                pub fn hidden() {}
            }

            struct Kernel;

            impl Kernel {
                pub fn method(&self) {}
            }

            trait Blur {
                fn blur(&self);
            }
        "#;
        assert_eq!(parse(source).unwrap(), vec!["outer"]);
    }

    #[test]
    fn test_macros_are_not_expanded() {
        let source = r#"
            macro_rules! make_fn {
                ($name:ident) => { pub fn $name() {} };
            }
            make_fn!(generated);
            pub fn written() {}
        "#;
        assert_eq!(parse(source).unwrap(), vec!["written"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("// nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_source_reports_position() {
        let err = parse("pub fn ok() {}\npub fn 42() {}\n").unwrap_err();
        assert_eq!(err.path, None);
        assert_eq!(err.line, 2);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_parse_file_attaches_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blur_gpu.rs");
        fs::write(&path, "fn broken(").unwrap();

        match parse_file(&path) {
            Err(ScanFileError::Parse(err)) => assert_eq!(err.path.as_deref(), Some(path.as_path())),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_missing() {
        let result = parse_file(Path::new("/no/such/blur_gpu.rs"));
        assert!(matches!(result, Err(ScanFileError::Read { .. })));
    }
}
