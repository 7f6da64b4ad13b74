//! Title and content search over a page subtree.
//!
//! The search mode is chosen once per request from an optional hint and
//! turned into a [`MatchStrategy`]. Matches are pushed to a
//! [`SearchListener`] in pre-order as the traversal finds them.

use regex::{Regex, RegexBuilder};

use crate::prelude::*;
use crate::wiki::{Descend, Page, PageData, PageTree};

/// Which page field a search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Title,
    Content,
}

impl SearchType {
    /// Absent hints and hints containing "title" (any case) select title
    /// search; everything else selects content search.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            None => SearchType::Title,
            Some(hint) if hint.to_lowercase().contains("title") => SearchType::Title,
            Some(_) => SearchType::Content,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Title => "Title",
            SearchType::Content => "Content",
        }
    }
}

/// Predicate applied to each visited page.
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Case-insensitive literal substring of the title. Holds the lowercased needle.
    Title(String),
    /// Case-insensitive pattern found anywhere in the content.
    Content(Regex),
}

impl MatchStrategy {
    pub fn title(search_string: &str) -> Self {
        MatchStrategy::Title(search_string.to_lowercase())
    }

    /// Compiles `search_string` case-insensitively with regex metacharacters
    /// taken literally: `a.b` matches only the three characters `a.b`.
    pub fn content(search_string: &str) -> Result<Self, SuiteError> {
        let regex = RegexBuilder::new(&regex::escape(search_string))
            .case_insensitive(true)
            .build()?;
        Ok(MatchStrategy::Content(regex))
    }

    pub fn for_type(search_type: SearchType, search_string: &str) -> Result<Self, SuiteError> {
        match search_type {
            SearchType::Title => Ok(Self::title(search_string)),
            SearchType::Content => Self::content(search_string),
        }
    }

    /// True when built from an empty search string; such a strategy matches nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            MatchStrategy::Title(needle) => needle.is_empty(),
            MatchStrategy::Content(regex) => regex.as_str().is_empty(),
        }
    }

    pub fn matches(&self, page: &Page) -> bool {
        match self {
            MatchStrategy::Title(needle) => page.title().to_lowercase().contains(needle.as_str()),
            MatchStrategy::Content(regex) => regex.is_match(page.content()),
        }
    }
}

/// Receives every matching page as it is found.
pub trait SearchListener {
    fn on_visit(&mut self, page: &Page);
}

impl<F> SearchListener for F
where
    F: FnMut(&Page),
{
    fn on_visit(&mut self, page: &Page) {
        self(page)
    }
}

/// Walks a subtree and reports matches.
#[derive(Debug)]
pub struct Searcher<'a> {
    tree: &'a PageTree,
}

impl<'a> Searcher<'a> {
    pub fn new(tree: &'a PageTree) -> Self {
        Self { tree }
    }

    /// Visits `root` and all its descendants once each, pre-order.
    /// An empty strategy does not traverse at all.
    pub fn search(&self, root: &Page, strategy: &MatchStrategy, listener: &mut dyn SearchListener) {
        if strategy.is_empty() {
            return;
        }
        self.tree.traverse(root.id(), |page| {
            if strategy.matches(page) {
                listener.on_visit(page);
            }
            Descend::Continue
        });
    }
}

/// A search as submitted by a caller: raw string plus optional type hint.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub search_string: Option<String>,
    pub search_type: Option<String>,
}

impl SearchRequest {
    pub fn new(search_string: impl Into<String>, search_type: Option<&str>) -> Self {
        Self {
            search_string: Some(search_string.into()),
            search_type: search_type.map(str::to_string),
        }
    }

    pub fn search_string(&self) -> &str {
        self.search_string.as_deref().unwrap_or("")
    }

    pub fn search_type(&self) -> SearchType {
        SearchType::from_hint(self.search_type.as_deref())
    }

    /// Heading for the result page; a request without a type is the bare form.
    pub fn title(&self) -> String {
        match self.search_type {
            None => "Search Form".to_string(),
            Some(_) => format!(
                "{} Search Results for '{}'",
                self.search_type().as_str(),
                self.search_string()
            ),
        }
    }

    /// Runs the search below `scope`. An empty search string is a no-op.
    pub fn respond(&self, tree: &PageTree, scope: &Page) -> Result<SearchResponse, SuiteError> {
        let mut hits = Vec::new();
        let strategy = MatchStrategy::for_type(self.search_type(), self.search_string())?;
        let mut collect = |page: &Page| hits.push(page.read_only_data());
        Searcher::new(tree).search(scope, &strategy, &mut collect);
        Ok(SearchResponse {
            title: self.title(),
            hits,
        })
    }
}

/// Ordered hits plus the human-readable framing around them.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub title: String,
    pub hits: Vec<PageData>,
}

impl SearchResponse {
    pub fn footer(&self) -> String {
        format!("Found {} results for your search.", self.hits.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::PageSpec;

    fn tree() -> PageTree {
        let mut builder = PageTree::builder();
        let suite = builder.add_child(builder.root(), PageSpec::new("Suite").content("nothing here"));
        builder.add_child(suite, PageSpec::new("LoginTest").content("value a.b expected"));
        builder.add_child(suite, PageSpec::new("Logout").content("value axb expected"));
        builder.build()
    }

    fn titles(tree: &PageTree, strategy: &MatchStrategy) -> Vec<String> {
        let mut found = Vec::new();
        let mut listener = |page: &Page| found.push(page.title().to_string());
        Searcher::new(tree).search(tree.root(), strategy, &mut listener);
        found
    }

    #[test]
    fn test_search_type_from_hint() {
        assert_eq!(SearchType::from_hint(None), SearchType::Title);
        assert_eq!(SearchType::from_hint(Some("PageTitle")), SearchType::Title);
        assert_eq!(SearchType::from_hint(Some("TITLE")), SearchType::Title);
        assert_eq!(SearchType::from_hint(Some("content")), SearchType::Content);
        assert_eq!(SearchType::from_hint(Some("")), SearchType::Content);
    }

    #[test]
    fn test_title_is_case_insensitive_substring() {
        let tree = tree();
        assert_eq!(titles(&tree, &MatchStrategy::title("Login")), vec!["LoginTest"]);
        assert_eq!(titles(&tree, &MatchStrategy::title("log")), vec!["LoginTest", "Logout"]);
    }

    #[test]
    fn test_content_is_literal() {
        let tree = tree();
        let strategy = MatchStrategy::content("A.B").unwrap();
        assert_eq!(titles(&tree, &strategy), vec!["LoginTest"]);
        let strategy = MatchStrategy::content("(unbalanced").unwrap();
        assert!(titles(&tree, &strategy).is_empty());
    }

    #[test]
    fn test_empty_strategy_never_calls_listener() {
        let tree = tree();
        assert!(titles(&tree, &MatchStrategy::title("")).is_empty());
        assert!(titles(&tree, &MatchStrategy::content("").unwrap()).is_empty());
    }

    #[test]
    fn test_request_title() {
        assert_eq!(SearchRequest::default().title(), "Search Form");
        assert_eq!(
            SearchRequest::new("abc", Some("content")).title(),
            "Content Search Results for 'abc'"
        );
    }
}
