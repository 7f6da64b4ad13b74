//! Loads a [`PageTree`] from a directory hierarchy.
//!
//! Every directory below the root directory is a page. A page directory may
//! hold `content.txt` (raw page content) and `properties.yaml`:
//!
//! ```yaml
//! title: Login scenarios
//! attributes: [Suite]
//! tags: [fast, smoke]
//! ```
//!
//! Children are ordered by directory name so traversal order is reproducible
//! across runs and machines.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use super::{PageId, PageSpec, PageTree, PageTreeBuilder, SUITE, TEST};
use crate::prelude::*;

/// Default name of the root page directory inside the configured root dir.
pub const DEFAULT_ROOT_DIRECTORY: &str = "FitNesseRoot";

const CONTENT_FILE: &str = "content.txt";
const PROPERTIES_FILE: &str = "properties.yaml";

/// Page names that never get a default `Test` attribute.
const SPECIAL_PAGES: [&str; 4] = ["SetUp", "TearDown", "SuiteSetUp", "SuiteTearDown"];

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PageProperties {
    title: Option<String>,
    attributes: Option<Vec<String>>,
    tags: Vec<String>,
}

/// Loads the tree rooted at `<root_path>/<root_directory>`.
pub fn load_page_tree(root_path: &Path, root_directory: &str) -> Result<PageTree, SuiteError> {
    let root_dir = root_path.join(root_directory);
    if !root_dir.is_dir() {
        return Err(SuiteError::PageTree {
            path: root_dir,
            message: "not a directory".to_string(),
            source: None,
        });
    }

    let root_spec = read_page_spec(&root_dir, "", false)?;
    let mut builder = PageTreeBuilder::with_root(root_spec);
    let root = builder.root();
    load_children(&mut builder, root, &root_dir)?;

    let tree = builder.build();
    debug!(root = %root_dir.display(), pages = tree.page_count(), "loaded page tree");
    Ok(tree)
}

fn load_children(builder: &mut PageTreeBuilder, parent: PageId, dir: &Path) -> Result<(), SuiteError> {
    for child_dir in child_directories(dir)? {
        let Some(name) = child_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let spec = read_page_spec(&child_dir, name, true)?;
        let id = builder.add_child(parent, spec);
        load_children(builder, id, &child_dir)?;
    }
    Ok(())
}

fn child_directories(dir: &Path) -> Result<Vec<PathBuf>, SuiteError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SuiteError::PageTree {
            path: dir.to_path_buf(),
            message: format!("Failed to walk directory: {}", e),
            source: Some(Box::new(e)),
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn read_page_spec(dir: &Path, name: &str, derive_defaults: bool) -> Result<PageSpec, SuiteError> {
    let content_path = dir.join(CONTENT_FILE);
    let content = if content_path.is_file() {
        fs::read_to_string(&content_path).map_err(|e| tree_error(&content_path, e))?
    } else {
        String::new()
    };

    let properties_path = dir.join(PROPERTIES_FILE);
    let properties = if properties_path.is_file() {
        let raw = fs::read_to_string(&properties_path).map_err(|e| tree_error(&properties_path, e))?;
        if raw.trim().is_empty() {
            PageProperties::default()
        } else {
            serde_yaml::from_str::<PageProperties>(&raw).map_err(|e| tree_error(&properties_path, e))?
        }
    } else {
        PageProperties::default()
    };

    let mut spec = PageSpec::new(name).content(content);
    if let Some(title) = properties.title {
        spec = spec.title(title);
    }
    let attributes = match properties.attributes {
        Some(attributes) => attributes,
        None if derive_defaults => default_attributes(name),
        None => Vec::new(),
    };
    for attribute in attributes {
        spec = spec.attribute(attribute);
    }
    for tag in properties.tags {
        spec = spec.tag(tag);
    }
    Ok(spec)
}

/// Attributes implied by a page name when none are declared.
pub fn default_attributes(name: &str) -> Vec<String> {
    let mut attributes = Vec::new();
    if SPECIAL_PAGES.contains(&name) {
        return attributes;
    }
    if name.starts_with(SUITE) || name.ends_with(SUITE) {
        attributes.push(SUITE.to_string());
    }
    if name.starts_with(TEST) || name.ends_with(TEST) {
        attributes.push(TEST.to_string());
    }
    attributes
}

fn tree_error<E>(path: &Path, err: E) -> SuiteError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SuiteError::PageTree {
        path: path.to_path_buf(),
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}
