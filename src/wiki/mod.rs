//! The read-only page tree that discovery, execution and search operate on.
//!
//! A [`PageTree`] is assembled once through a [`PageTreeBuilder`] (by hand, or
//! by [`loader::load_page_tree`] from a directory) and frozen afterwards.
//! There is no write path: the tree is `Send + Sync` and can be traversed by
//! any number of concurrent runs and searches.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::prelude::*;

pub mod loader;
pub mod path;

pub use path::PagePath;

/// Attribute marking a page as the root of a suite.
pub const SUITE: &str = "Suite";
/// Attribute marking a page as an executable test.
pub const TEST: &str = "Test";
/// Attribute excluding a page and its whole subtree from suite runs.
pub const PRUNE: &str = "Prune";

/// Index of a page inside its [`PageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// Immutable snapshot of a page's data, handed to backends and listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageData {
    pub path: PagePath,
    pub title: String,
    pub content: String,
    pub attributes: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl PageData {
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }
}

/// A node of the tree: its data plus the structural links.
#[derive(Debug, Clone)]
pub struct Page {
    id: PageId,
    parent: Option<PageId>,
    children: Vec<PageId>,
    data: PageData,
}

impl Page {
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn parent(&self) -> Option<PageId> {
        self.parent
    }

    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    pub fn path(&self) -> &PagePath {
        &self.data.path
    }

    pub fn title(&self) -> &str {
        &self.data.title
    }

    pub fn content(&self) -> &str {
        &self.data.content
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.data.has_attribute(attribute)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.data.tags
    }

    pub fn is_suite(&self) -> bool {
        self.has_attribute(SUITE)
    }

    pub fn is_test(&self) -> bool {
        self.has_attribute(TEST)
    }

    pub fn is_pruned(&self) -> bool {
        self.has_attribute(PRUNE)
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    /// Owned copy of the page data, detached from the tree.
    pub fn read_only_data(&self) -> PageData {
        self.data.clone()
    }
}

/// Whether a traversal should descend below the page just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descend {
    Continue,
    SkipChildren,
}

/// Frozen hierarchy of pages in natural child order.
#[derive(Debug, Clone)]
pub struct PageTree {
    pages: Vec<Page>,
}

impl PageTree {
    pub fn builder() -> PageTreeBuilder {
        PageTreeBuilder::new()
    }

    pub fn root(&self) -> &Page {
        &self.pages[0]
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id.0]
    }

    /// Number of pages, root included.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Resolves a path from the root by walking child names.
    pub fn find(&self, path: &PagePath) -> Option<&Page> {
        let mut current = self.root();
        for segment in path.segments() {
            let next = current
                .children
                .iter()
                .map(|id| self.page(*id))
                .find(|child| child.path().name() == Some(segment.as_str()))?;
            current = next;
        }
        Some(current)
    }

    /// Like [`find`](Self::find), failing with `PageNotFound`.
    pub fn get(&self, path: &PagePath) -> Result<&Page, SuiteError> {
        self.find(path).ok_or_else(|| SuiteError::PageNotFound {
            path: path.to_string(),
        })
    }

    /// Ancestors of a page, nearest first, excluding the page itself.
    pub fn ancestors(&self, id: PageId) -> impl Iterator<Item = &Page> + '_ {
        let mut next = self.page(id).parent;
        std::iter::from_fn(move || {
            let page = self.page(next?);
            next = page.parent;
            Some(page)
        })
    }

    /// Depth-first pre-order traversal starting at (and including) `start`.
    ///
    /// Children are visited in their natural order. The visitor decides per
    /// page whether the traversal descends into its children.
    pub fn traverse<'a, F>(&'a self, start: PageId, mut visit: F)
    where
        F: FnMut(&'a Page) -> Descend,
    {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let page = self.page(id);
            if visit(page) == Descend::SkipChildren {
                continue;
            }
            stack.extend(page.children.iter().rev().copied());
        }
    }
}

/// Description of a page to add through the builder.
#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    name: String,
    title: Option<String>,
    content: String,
    attributes: BTreeSet<String>,
    tags: BTreeSet<String>,
}

impl PageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.insert(attribute.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn suite(self) -> Self {
        self.attribute(SUITE)
    }

    pub fn test(self) -> Self {
        self.attribute(TEST)
    }
}

/// Mutable staging area for a [`PageTree`].
#[derive(Debug)]
pub struct PageTreeBuilder {
    pages: Vec<Page>,
}

impl PageTreeBuilder {
    pub fn new() -> Self {
        Self::with_root(PageSpec::new(""))
    }

    /// Starts a tree whose root page carries the given content and attributes.
    /// The root's name is ignored: its path is always empty.
    pub fn with_root(spec: PageSpec) -> Self {
        let title = spec.title.unwrap_or_else(|| "root".to_string());
        let root = Page {
            id: PageId(0),
            parent: None,
            children: Vec::new(),
            data: PageData {
                path: PagePath::root(),
                title,
                content: spec.content,
                attributes: spec.attributes,
                tags: spec.tags,
            },
        };
        Self { pages: vec![root] }
    }

    pub fn root(&self) -> PageId {
        PageId(0)
    }

    /// Appends a child after the parent's existing children.
    pub fn add_child(&mut self, parent: PageId, spec: PageSpec) -> PageId {
        let id = PageId(self.pages.len());
        let path = self.pages[parent.0].data.path.child(&spec.name);
        let title = spec.title.unwrap_or_else(|| spec.name.clone());
        self.pages.push(Page {
            id,
            parent: Some(parent),
            children: Vec::new(),
            data: PageData {
                path,
                title,
                content: spec.content,
                attributes: spec.attributes,
                tags: spec.tags,
            },
        });
        self.pages[parent.0].children.push(id);
        id
    }

    pub fn build(self) -> PageTree {
        PageTree { pages: self.pages }
    }
}

impl Default for PageTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
