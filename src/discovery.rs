use tracing::debug;

use crate::filter::SuiteFilter;
use crate::prelude::*;
use crate::wiki::{Descend, Page, PageTree};

/// Collects the test pages that belong to a suite.
///
/// The suite page's subtree is walked depth-first in natural child order. A
/// page is selected when it is a test page and the [`SuiteFilter`] accepts
/// it. Pruned pages are skipped together with everything below them. The
/// result order is the traversal order and is never re-sorted.
#[derive(Debug)]
pub struct SuiteContentsFinder<'a> {
    tree: &'a PageTree,
    filter: &'a SuiteFilter,
}

impl<'a> SuiteContentsFinder<'a> {
    pub fn new(tree: &'a PageTree, filter: &'a SuiteFilter) -> Self {
        Self { tree, filter }
    }

    /// Returns the pages to run for `suite_root`, possibly none.
    pub fn find_all(&self, suite_root: &Page) -> Result<Vec<&'a Page>, SuiteError> {
        if !suite_root.is_suite() {
            return Err(SuiteError::NotASuite {
                path: suite_root.path().to_string(),
            });
        }

        let mut pages = Vec::new();
        self.tree.traverse(suite_root.id(), |page| {
            if page.is_pruned() {
                debug!(page = %page.path(), "pruned");
                return Descend::SkipChildren;
            }
            if page.is_test() && self.filter.accepts(page) {
                pages.push(page);
            }
            Descend::Continue
        });

        debug!(
            suite = %suite_root.path(),
            selected = pages.len(),
            "suite contents"
        );
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::{PagePath, PageSpec, PRUNE};

    fn paths(pages: &[&Page]) -> Vec<String> {
        pages.iter().map(|p| p.path().to_string()).collect()
    }

    #[test]
    fn test_pruned_subtree_skipped() {
        let mut builder = PageTree::builder();
        let suite = builder.add_child(builder.root(), PageSpec::new("S").suite());
        builder.add_child(suite, PageSpec::new("T1").test());
        let pruned = builder.add_child(suite, PageSpec::new("Old").suite().attribute(PRUNE));
        builder.add_child(pruned, PageSpec::new("T2").test());
        let tree = builder.build();

        let filter = SuiteFilter::match_all();
        let root = tree.get(&PagePath::parse("S", "suite_name").unwrap()).unwrap();
        let pages = SuiteContentsFinder::new(&tree, &filter).find_all(root).unwrap();
        assert_eq!(paths(&pages), vec!["S.T1"]);
    }

    #[test]
    fn test_test_suite_root_is_included() {
        let mut builder = PageTree::builder();
        let suite = builder.add_child(builder.root(), PageSpec::new("S").suite().test());
        builder.add_child(suite, PageSpec::new("Container"));
        let tree = builder.build();

        let filter = SuiteFilter::match_all();
        let root = tree.get(&PagePath::parse("S", "suite_name").unwrap()).unwrap();
        let pages = SuiteContentsFinder::new(&tree, &filter).find_all(root).unwrap();
        assert_eq!(paths(&pages), vec!["S"]);
    }
}
