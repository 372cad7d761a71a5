//! End-to-end registration tests: when backend files are scanned, when
//! backends are imported, and what happens when a backend file is broken.

use imgkit_dispatch::{
    BackendContext, BackendModule, Eligible, ImportState, LoaderTable, RegistryError,
};
use imgkit_tests::kernels::{backend, filter, module, CountingLoader, Filter};
use imgkit_tests::{Image, PackageFixture};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn two_module_package() -> PackageFixture {
    let fixture = PackageFixture::new();
    fixture.add_module("filters", "blur", &["gaussian", "median"]);
    fixture.add_backend("filters", "blur", "gpu", &["gaussian", "median"]);
    fixture.add_module("morphology", "erode", &["erode"]);
    fixture.add_backend("morphology", "erode", "gpu", &["erode"]);
    fixture
}

fn gpu_table() -> LoaderTable {
    LoaderTable::new()
        .with(module("imgkit.filters.blur"), backend("gpu"), || {
            BackendModule::new()
                .with::<Filter>("gaussian", filter("gpu.gaussian", 2.0))
                .with::<Filter>("median", filter("gpu.median", 2.0))
        })
        .with(module("imgkit.morphology.erode"), backend("gpu"), || {
            BackendModule::new().with::<Filter>("erode", filter("gpu.erode", 2.0))
        })
}

fn register(ctx: &Arc<BackendContext>, module_path: &str, name: &str) {
    ctx.eligible(Eligible::<Filter>::new(
        module_path,
        name,
        filter("default", 1.0),
    ))
    .unwrap();
}

#[test]
fn discovery_does_not_scan_backend_files() {
    let fixture = two_module_package();
    // Broken on purpose: discovery must not read it.
    fixture.add_backend_source("filters", "blur", "gpu", "pub fn gaussian( {");

    let ctx = BackendContext::new(fixture.layout(), gpu_table()).unwrap();
    let blur = module("imgkit.filters.blur");
    let report = ctx.inspect(&blur).unwrap();
    assert!(!report.scanned);
    assert!(report.backends.iter().all(|b| b.functions.is_empty()));
}

#[test]
fn first_registration_scans_and_later_ones_do_not() {
    let fixture = two_module_package();
    let ctx = BackendContext::new(fixture.layout(), gpu_table()).unwrap();
    let blur = module("imgkit.filters.blur");

    register(&ctx, "imgkit.filters.blur", "gaussian");
    let gpu = &ctx.inspect(&blur).unwrap().backends[1];
    assert_eq!(
        gpu.functions,
        vec![("gaussian".to_string(), false), ("median".to_string(), false)]
    );

    // A broken backend file after the scan is never read again.
    fixture.add_backend_source("filters", "blur", "gpu", "pub fn gaussian( {");
    register(&ctx, "imgkit.filters.blur", "median");
    assert!(ctx.inspect(&blur).unwrap().scanned);
}

#[test]
fn parse_error_surfaces_to_registration() {
    let fixture = two_module_package();
    let path = fixture.add_backend_source("filters", "blur", "gpu", "pub fn gaussian( {");
    let ctx = BackendContext::new(fixture.layout(), gpu_table()).unwrap();

    let result = ctx.eligible(Eligible::<Filter>::new(
        "imgkit.filters.blur",
        "gaussian",
        filter("default", 1.0),
    ));
    match result {
        Err(RegistryError::Scan(err)) => assert_eq!(err.path.as_deref(), Some(path.as_path())),
        other => panic!("expected scan error, got {:?}", other.map(|_| ())),
    }

    let blur = module("imgkit.filters.blur");
    let report = ctx.inspect(&blur).unwrap();
    assert!(!report.scanned);
    assert!(report.backends[0].functions.is_empty());
}

#[test]
fn use_backend_imports_each_module_once() {
    let fixture = two_module_package();
    let (loader, counts) = CountingLoader::shared(gpu_table());
    let ctx = BackendContext::new(fixture.layout(), loader).unwrap();
    register(&ctx, "imgkit.filters.blur", "gaussian");
    register(&ctx, "imgkit.morphology.erode", "erode");

    ctx.use_backend("gpu");
    ctx.use_backend("gpu");

    assert_eq!(counts.loads("imgkit.filters.blur", "gpu"), 1);
    assert_eq!(counts.loads("imgkit.morphology.erode", "gpu"), 1);
    assert_eq!(counts.total_loads(), 2);
}

#[test]
fn switching_before_registration_imports_at_registration() {
    let fixture = two_module_package();
    let (loader, counts) = CountingLoader::shared(gpu_table());
    let ctx = BackendContext::new(fixture.layout(), loader).unwrap();

    ctx.use_backend("gpu");
    assert_eq!(counts.total_loads(), 0);

    let gaussian = ctx
        .eligible(Eligible::<Filter>::new(
            "imgkit.filters.blur",
            "gaussian",
            filter("default", 1.0),
        ))
        .unwrap();
    assert_eq!(counts.loads("imgkit.filters.blur", "gpu"), 1);
    assert_eq!(counts.loads("imgkit.morphology.erode", "gpu"), 0);

    let out = gaussian.call(|k| k(&Image::filled(1, 1, 1.0), 1.0)).unwrap();
    assert_eq!(out.produced_by, "gpu.gaussian");

    // The second function of the module was bound by the same import.
    let median = ctx
        .eligible(Eligible::<Filter>::new(
            "imgkit.filters.blur",
            "median",
            filter("default", 1.0),
        ))
        .unwrap();
    assert_eq!(counts.loads("imgkit.filters.blur", "gpu"), 1);
    let out = median.call(|k| k(&Image::filled(1, 1, 1.0), 1.0)).unwrap();
    assert_eq!(out.produced_by, "gpu.median");
}

#[test]
fn failed_import_is_permanent() {
    let fixture = two_module_package();
    let (loader, counts) = CountingLoader::shared(LoaderTable::new());
    let ctx = BackendContext::new(fixture.layout(), loader).unwrap();
    register(&ctx, "imgkit.filters.blur", "gaussian");
    let blur = module("imgkit.filters.blur");

    ctx.use_backend("gpu");
    ctx.use_backend("default");
    ctx.use_backend("gpu");

    assert_eq!(counts.loads("imgkit.filters.blur", "gpu"), 1);
    let report = ctx.inspect(&blur).unwrap();
    assert_eq!(report.backends[1].state, ImportState::Failed);
}

#[test]
fn module_outside_discovery_has_only_default() {
    let fixture = two_module_package();
    let ctx = BackendContext::new(fixture.layout(), gpu_table()).unwrap();
    let gamma = ctx
        .eligible(
            Eligible::<Filter>::new("imgkit.exposure.gamma", "adjust", filter("default", 1.0))
                .description("Gamma correction."),
        )
        .unwrap();

    ctx.use_backend("gpu");
    assert_eq!(gamma.description(), "Gamma correction.");
    let report = ctx.inspect(gamma.module()).unwrap();
    assert_eq!(report.backends.len(), 1);
    assert_eq!(report.backends[0].state, ImportState::Imported);
}

#[test]
fn malformed_definitions_are_rejected() {
    let fixture = two_module_package();
    let ctx = BackendContext::new(fixture.layout(), gpu_table()).unwrap();

    let bad_module = ctx.eligible(Eligible::<Filter>::new(
        "imgkit..blur",
        "gaussian",
        filter("default", 1.0),
    ));
    assert!(matches!(bad_module, Err(RegistryError::Name(_))));

    let bad_name = ctx.eligible(Eligible::<Filter>::new(
        "imgkit.filters.blur",
        "gaussian blur",
        filter("default", 1.0),
    ));
    assert!(matches!(bad_name, Err(RegistryError::InvalidFunctionName(_))));
}
