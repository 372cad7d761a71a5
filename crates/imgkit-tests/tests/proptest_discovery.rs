//! Property-based discovery tests using proptest.
//!
//! Random package trees are written to disk and discovery is checked
//! against the file-name convention.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p imgkit-tests --test proptest_discovery
//! ```

use imgkit_dispatch::{discovery, BackendName, ModulePath};
use imgkit_tests::PackageFixture;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// One backend file: (submodule, target, backend, whether the sibling exists).
type BackendFile = (String, String, String, bool);

fn submodule() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["filters", "morphology", "exposure"]).prop_map(str::to_string)
}

fn target() -> impl Strategy<Value = String> {
    "[a-z]{1,6}(_[a-z]{1,4})?"
}

fn backend_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["gpu", "opencl", "simd", "cuda"]).prop_map(str::to_string)
}

fn backend_files() -> impl Strategy<Value = Vec<BackendFile>> {
    prop::collection::vec((submodule(), target(), backend_name(), any::<bool>()), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every backend file with a sibling is discovered; every orphan is not.
    #[test]
    fn discovery_matches_file_convention(files in backend_files()) {
        let fixture = PackageFixture::new();
        let mut expected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut siblings: BTreeSet<(String, String)> = BTreeSet::new();

        for (sub, target, _, has_sibling) in &files {
            if *has_sibling {
                siblings.insert((sub.clone(), target.clone()));
            }
        }
        for (sub, target) in &siblings {
            fixture.add_module(sub, target, &["run"]);
        }
        for (sub, target, backend, _) in &files {
            fixture.add_backend(sub, target, backend, &["run"]);
            if siblings.contains(&(sub.clone(), target.clone())) {
                expected
                    .entry(format!("imgkit.{}.{}", sub, target))
                    .or_default()
                    .insert(backend.clone());
            }
        }

        let found = discovery::scan(&fixture.layout()).unwrap();

        let actual: BTreeMap<String, BTreeSet<String>> = found
            .modules()
            .map(|(m, backends)| {
                (m.to_string(), backends.iter().map(|b| b.to_string()).collect())
            })
            .collect();
        prop_assert_eq!(&actual, &expected);

        let mut names: BTreeSet<String> = expected.values().flatten().cloned().collect();
        names.insert(BackendName::DEFAULT.to_string());
        let discovered: BTreeSet<String> =
            found.backends().iter().map(|b| b.to_string()).collect();
        prop_assert_eq!(discovered, names);
    }

    /// Module paths built from discovered names always round-trip through
    /// the backend-module convention.
    #[test]
    fn backend_module_path_has_suffix(target in target(), backend in backend_name()) {
        let module = ModulePath::parse(format!("imgkit.filters.{}", target)).unwrap();
        let backend = BackendName::new(backend).unwrap();
        let path = module.backend_module("backend", &backend);
        prop_assert_eq!(path, format!("imgkit.filters.backend.{}_{}", target, backend));
    }

    /// Backend names with separators are always rejected.
    #[test]
    fn backend_names_with_separators_rejected(a in "[a-z]{1,5}", b in "[a-z]{1,5}", sep in "[_.]") {
        let name = format!("{}{}{}", a, sep, b);
        prop_assert!(BackendName::new(name).is_err());
    }
}
