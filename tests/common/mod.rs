//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fitsuite::execution::{FnTestSystem, TestCounts};
use fitsuite::wiki::{PageSpec, PageTree};
use fitsuite::{SuiteConfiguration, SuiteConfigurationBuilder, SuiteError};

/// `S` (suite) holding `T1` tagged `fast` and `T2` tagged `slow`.
pub fn fast_slow_tree() -> PageTree {
    let mut builder = PageTree::builder();
    let suite = builder.add_child(builder.root(), PageSpec::new("S").suite());
    builder.add_child(suite, PageSpec::new("T1").test().tag("fast"));
    builder.add_child(suite, PageSpec::new("T2").test().tag("slow"));
    builder.build()
}

/// A builder with every mandatory field set, writing artifacts to `output`.
pub fn builder(suite: &str, output: &Path) -> SuiteConfigurationBuilder {
    SuiteConfiguration::builder()
        .suite_name(suite)
        .root_path(".")
        .output_dir(output)
}

/// An in-process backend reporting `counts` for every page.
pub fn fixed_system(name: &str, counts: TestCounts) -> FnTestSystem {
    FnTestSystem::new(name, move |_| Ok(counts))
}

/// Like [`fixed_system`], also counting its invocations.
pub fn counting_system(name: &str, counts: TestCounts) -> (FnTestSystem, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let system = FnTestSystem::new(name, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok::<_, SuiteError>(counts)
    });
    (system, calls)
}

/// Writes one page directory below `root`, creating parents as needed.
pub fn write_page(root: &Path, relative: &str, content: &str, properties: Option<&str>) {
    let dir = root.join(relative);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("content.txt"), content).unwrap();
    if let Some(properties) = properties {
        fs::write(dir.join("properties.yaml"), properties).unwrap();
    }
}
