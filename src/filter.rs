//! Tag expressions and the include/exclude suite filter.
//!
//! Expression grammar:
//!
//! ```text
//! expression  := alternative ("," alternative)*     // any alternative matches
//! alternative := term ("&" term)*                   // every term matches
//! term        := "!"? tag
//! ```
//!
//! `fast,smoke&!flaky` accepts pages tagged `fast`, and pages tagged `smoke`
//! that are not tagged `flaky`.

use std::collections::BTreeSet;
use std::fmt;

use crate::prelude::*;
use crate::wiki::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    tag: String,
    negated: bool,
}

impl Term {
    fn matches(&self, tags: &BTreeSet<String>) -> bool {
        tags.contains(&self.tag) != self.negated
    }
}

/// A parsed, non-empty tag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpression {
    alternatives: Vec<Vec<Term>>,
}

impl TagExpression {
    /// Parses `text`. Returns `Ok(None)` for a blank expression; `field`
    /// names the configuration field reported on failure.
    pub fn parse(text: &str, field: &str) -> Result<Option<Self>, SuiteError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut alternatives = Vec::new();
        for alternative in text.split(',') {
            let mut terms = Vec::new();
            for raw in alternative.split('&') {
                let raw = raw.trim();
                let (negated, tag) = match raw.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, raw),
                };
                if tag.is_empty() {
                    return Err(config_err!(field, "empty tag in filter expression '{}'", text));
                }
                if tag.starts_with('!') || tag.chars().any(char::is_whitespace) {
                    return Err(config_err!(field, "malformed tag '{}' in filter expression '{}'", tag, text));
                }
                terms.push(Term {
                    tag: tag.to_string(),
                    negated,
                });
            }
            alternatives.push(terms);
        }
        Ok(Some(Self { alternatives }))
    }

    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        self.alternatives
            .iter()
            .any(|terms| terms.iter().all(|term| term.matches(tags)))
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .alternatives
            .iter()
            .map(|terms| {
                terms
                    .iter()
                    .map(|t| if t.negated { format!("!{}", t.tag) } else { t.tag.clone() })
                    .collect::<Vec<_>>()
                    .join("&")
            })
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// Accept/reject decision for a single page.
///
/// A page passes when it satisfies the include expression (if any) and does
/// not satisfy the exclude expression (if any). Only the page's own tags are
/// consulted, so the decision never depends on siblings or traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteFilter {
    include: Option<TagExpression>,
    exclude: Option<TagExpression>,
}

impl SuiteFilter {
    pub fn new(include: Option<TagExpression>, exclude: Option<TagExpression>) -> Self {
        Self { include, exclude }
    }

    /// Accepts every page.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Builds a filter from the raw configuration strings.
    pub fn parse(include: Option<&str>, exclude: Option<&str>) -> Result<Self, SuiteError> {
        let include = match include {
            Some(text) => TagExpression::parse(text, "suite_filter")?,
            None => None,
        };
        let exclude = match exclude {
            Some(text) => TagExpression::parse(text, "exclude_suite_filter")?,
            None => None,
        };
        Ok(Self { include, exclude })
    }

    pub fn accepts_tags(&self, tags: &BTreeSet<String>) -> bool {
        let included = self.include.as_ref().map_or(true, |e| e.matches(tags));
        let excluded = self.exclude.as_ref().is_some_and(|e| e.matches(tags));
        included && !excluded
    }

    pub fn accepts(&self, page: &Page) -> bool {
        self.accepts_tags(page.tags())
    }
}
