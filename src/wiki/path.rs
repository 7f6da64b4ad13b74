use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// A dotted page path such as `MySuite.MySubSuite`.
///
/// The root page has the empty path. A leading `.` marks the path as
/// absolute and is accepted but not stored: every path resolves from the
/// tree root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PagePath {
    segments: Vec<String>,
}

impl PagePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. `field` names the configuration field the path
    /// came from and is reported on failure.
    pub fn parse(text: &str, field: &str) -> Result<Self, SuiteError> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in body.split('.') {
            if segment.is_empty() {
                return Err(config_err!(field, "empty segment in page path '{}'", text));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(config_err!(field, "whitespace in page path '{}'", text));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
