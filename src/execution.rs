//! Execution of discovered pages against test systems.
//!
//! - [`request`] builds one [`ExecutionRequest`](request::ExecutionRequest) per page.
//! - [`system`] is the backend contract and the registry of named backends.
//! - [`command`] is the process-spawning backend.
//! - [`listener`] is the ordered result-listener fan-out.
//! - [`runner`] drives a set of requests and aggregates their results.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

pub mod command;
pub mod listener;
pub mod request;
pub mod runner;
pub mod system;

pub use command::CommandTestSystem;
pub use listener::{Listeners, ResultCollector, TestSystemListener};
pub use request::{ClassPathBuilder, ExecutionRequest, RequestContext};
pub use runner::MultipleTestsRunner;
pub use system::{FnTestSystem, TestSystem, TestSystemRegistry};

/// Assertion-level counts reported by a backend for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    #[serde(default)]
    pub right: usize,
    #[serde(default)]
    pub wrong: usize,
    #[serde(default)]
    pub exceptions: usize,
}

impl TestCounts {
    pub fn new(right: usize, wrong: usize, exceptions: usize) -> Self {
        Self {
            right,
            wrong,
            exceptions,
        }
    }

    /// Counts for a page whose execution raised instead of reporting.
    pub fn exception() -> Self {
        Self::new(0, 0, 1)
    }

    pub fn total(&self) -> usize {
        self.right + self.wrong + self.exceptions
    }
}

impl AddAssign for TestCounts {
    fn add_assign(&mut self, other: Self) {
        self.right += other.right;
        self.wrong += other.wrong;
        self.exceptions += other.exceptions;
    }
}

impl fmt::Display for TestCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} right, {} wrong, {} exceptions",
            self.right, self.wrong, self.exceptions
        )
    }
}

/// Terminal status of one page run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    Pass,
    Fail,
    /// The backend raised; the message is what it raised.
    Error(String),
}

/// Outcome of running one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// Full dotted path of the page, which is also its test description.
    pub page: String,
    pub counts: TestCounts,
    pub status: TestStatus,
}

impl TestResult {
    pub fn from_counts(page: impl Into<String>, counts: TestCounts) -> Self {
        let status = if counts.exceptions > 0 {
            TestStatus::Error(format!("{} exceptions", counts.exceptions))
        } else if counts.wrong > 0 {
            TestStatus::Fail
        } else {
            TestStatus::Pass
        };
        Self {
            page: page.into(),
            counts,
            status,
        }
    }

    /// Result recorded for a page whose execution failed outright.
    pub fn from_error(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            counts: TestCounts::exception(),
            status: TestStatus::Error(message.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Pass
    }
}

/// Aggregate of every result of a run. A pure sum, so the order in which
/// results are applied never changes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub right: usize,
    pub wrong: usize,
    pub exceptions: usize,
    pub pages_executed: usize,
}

impl SuiteSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: &TestResult) {
        self.right += result.counts.right;
        self.wrong += result.counts.wrong;
        self.exceptions += result.counts.exceptions;
        self.pages_executed += 1;
    }

    /// Assertion-level total: right + wrong + exceptions.
    pub fn total(&self) -> usize {
        self.right + self.wrong + self.exceptions
    }

    pub fn counts(&self) -> TestCounts {
        TestCounts::new(self.right, self.wrong, self.exceptions)
    }
}

impl<'a> FromIterator<&'a TestResult> for SuiteSummary {
    fn from_iter<I: IntoIterator<Item = &'a TestResult>>(iter: I) -> Self {
        let mut summary = SuiteSummary::new();
        for result in iter {
            summary.add(result);
        }
        summary
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} right, {} wrong, {} exceptions ({} pages)",
            self.right, self.wrong, self.exceptions, self.pages_executed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        assert_eq!(TestResult::from_counts("A", TestCounts::new(3, 0, 0)).status, TestStatus::Pass);
        assert_eq!(TestResult::from_counts("A", TestCounts::new(3, 1, 0)).status, TestStatus::Fail);
        assert!(matches!(
            TestResult::from_counts("A", TestCounts::new(0, 1, 2)).status,
            TestStatus::Error(_)
        ));
    }

    #[test]
    fn test_summary_is_order_independent() {
        let results = vec![
            TestResult::from_counts("A", TestCounts::new(2, 0, 0)),
            TestResult::from_counts("B", TestCounts::new(0, 1, 0)),
            TestResult::from_error("C", "boom"),
        ];
        let forward: SuiteSummary = results.iter().collect();
        let backward: SuiteSummary = results.iter().rev().collect();
        assert_eq!(forward, backward);
        assert_eq!(forward.total(), 4);
        assert_eq!(forward.pages_executed, 3);
        assert_eq!(forward.to_string(), "2 right, 1 wrong, 1 exceptions (3 pages)");
    }
}
