use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::wiki::{Page, PageData, PageTree};

/// Variable naming the test system a page runs on.
pub const TEST_SYSTEM_VARIABLE: &str = "TEST_SYSTEM";

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Everything a backend needs to run one page.
///
/// Run-wide settings (classpath, debug, port) travel inside each request;
/// backends hold no ambient state.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub page: PageData,
    pub full_path: String,
    pub test_system: String,
    pub class_path: String,
    pub debug: bool,
    pub port: u16,
}

/// Run-wide values shared by every request of one run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub class_path: String,
    pub default_test_system: String,
    pub debug: bool,
    pub port: u16,
}

impl RequestContext {
    pub fn request_for(&self, tree: &PageTree, page: &Page) -> ExecutionRequest {
        let test_system = lookup_define(tree, page, TEST_SYSTEM_VARIABLE)
            .unwrap_or_else(|| self.default_test_system.clone());
        ExecutionRequest {
            page: page.read_only_data(),
            full_path: page.path().to_string(),
            test_system,
            class_path: self.class_path.clone(),
            debug: self.debug,
            port: self.port,
        }
    }
}

static DEFINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^!define[ \t]+(\w+)[ \t]+(?:\{([^}]*)\}|\(([^)]*)\)|\[([^\]]*)\])").unwrap()
});

static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^!path[ \t]+(\S.*?)[ \t]*$").unwrap());

/// Value of `!define name {value}` in the page's own content.
fn define_in(content: &str, name: &str) -> Option<String> {
    DEFINE_PATTERN
        .captures_iter(content)
        .filter(|caps| &caps[1] == name)
        .filter_map(|caps| caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)))
        .map(|m| m.as_str().trim().to_string())
        .last()
}

/// Resolves a variable on the page, then on its ancestors, nearest first.
pub fn lookup_define(tree: &PageTree, page: &Page, name: &str) -> Option<String> {
    std::iter::once(page)
        .chain(tree.ancestors(page.id()))
        .find_map(|p| define_in(p.content(), name))
}

/// Collects `!path` entries from a set of pages and their ancestors.
#[derive(Debug, Default)]
pub struct ClassPathBuilder {
    entries: Vec<String>,
}

impl ClassPathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: &str) {
        if !self.entries.iter().any(|e| e == entry) {
            self.entries.push(entry.to_string());
        }
    }

    /// Entries of each page (nearest first), in page order, without duplicates.
    pub fn build_class_path(mut self, tree: &PageTree, pages: &[&Page]) -> String {
        for page in pages {
            for source in std::iter::once(*page).chain(tree.ancestors(page.id())) {
                for caps in PATH_PATTERN.captures_iter(source.content()) {
                    self.push(&caps[1]);
                }
            }
        }
        self.entries.join(PATH_SEPARATOR)
    }
}
