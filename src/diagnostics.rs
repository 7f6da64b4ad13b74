//! Unified, `miette`-based diagnostics for fitsuite.
//!
//! Every failure produced by configuration, discovery, execution or the final
//! verdict is a [`SuiteError`]. Fatal variants (`Configuration`, `NotASuite`,
//! `PageNotFound`, `PageTree`) abort a run before anything executes;
//! `Execution` is recovered per page and folded into the summary; `Verdict`
//! is the single externally visible failing result of a completed run.
//!
//! # Error Construction Macros
//!
//! - `config_err!(field, "message {}", arg)` for configuration problems.
//! - `exec_err!(page, "message {}", arg)` for a failed backend invocation.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::execution::SuiteSummary;

/// One of the three independently identifiable verdict checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictFailure {
    /// At least one assertion was wrong.
    WrongAssertions(usize),
    /// At least one exception was raised while running the pages.
    Exceptions(usize),
    /// No assertion was executed at all.
    NoTestsExecuted,
}

impl VerdictFailure {
    /// Stable name of the check, usable by callers that need to tell
    /// "no tests ran" apart from "tests ran and failed".
    pub fn check_name(&self) -> &'static str {
        match self {
            VerdictFailure::WrongAssertions(_) => "wrong",
            VerdictFailure::Exceptions(_) => "exceptions",
            VerdictFailure::NoTestsExecuted => "at least one test",
        }
    }
}

impl std::fmt::Display for VerdictFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictFailure::WrongAssertions(n) => write!(f, "wrong: expected 0, got {}", n),
            VerdictFailure::Exceptions(n) => write!(f, "exceptions: expected 0, got {}", n),
            VerdictFailure::NoTestsExecuted => write!(f, "no tests executed"),
        }
    }
}

/// Unified error type for all fitsuite failure modes.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Configuration error: `{field}`: {message}")]
    Configuration { field: String, message: String },

    #[error("page {path} is not a suite")]
    NotASuite { path: String },

    #[error("page {path} does not exist")]
    PageNotFound { path: String },

    #[error("Failed to load page tree from '{}': {message}", .path.display())]
    PageTree {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Execution of {page} failed: {message}")]
    Execution {
        page: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("{message}")]
    Verdict {
        suite: String,
        message: String,
        failures: Vec<VerdictFailure>,
        summary: SuiteSummary,
    },

    #[error("Invalid search pattern: {0}")]
    Search(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl SuiteError {
    /// True for errors that abort a run before any page executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SuiteError::Configuration { .. }
                | SuiteError::NotASuite { .. }
                | SuiteError::PageNotFound { .. }
                | SuiteError::PageTree { .. }
        )
    }
}

impl Diagnostic for SuiteError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            SuiteError::Configuration { .. } => "fitsuite::config",
            SuiteError::NotASuite { .. } => "fitsuite::not_a_suite",
            SuiteError::PageNotFound { .. } => "fitsuite::page_not_found",
            SuiteError::PageTree { .. } => "fitsuite::page_tree",
            SuiteError::Execution { .. } => "fitsuite::execution",
            SuiteError::Verdict { .. } => "fitsuite::verdict",
            SuiteError::Search(_) => "fitsuite::search",
            SuiteError::Io(_) => "fitsuite::io",
            SuiteError::Serialization(_) => "fitsuite::serialization",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            SuiteError::Configuration { field, .. } => {
                format!("set `{}` in the suite configuration file or on the command line", field)
            }
            SuiteError::NotASuite { .. } => {
                "add the `Suite` attribute to the page's properties.yaml".to_string()
            }
            SuiteError::Verdict { failures, .. } if failures.contains(&VerdictFailure::NoTestsExecuted) => {
                "check the suite filters; no page with assertions was selected".to_string()
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Constructs a `SuiteError::Configuration` naming the offending field.
#[macro_export]
macro_rules! config_err {
    ($field:expr, $msg:expr, $($arg:expr),+) => {
        $crate::SuiteError::Configuration {
            field: $field.to_string(),
            message: format!($msg, $($arg),+),
        }
    };
    ($field:expr, $msg:expr) => {
        $crate::SuiteError::Configuration {
            field: $field.to_string(),
            message: $msg.to_string(),
        }
    };
}

/// Constructs a `SuiteError::Execution` for the given page.
#[macro_export]
macro_rules! exec_err {
    ($page:expr, $msg:expr, $($arg:expr),+) => {
        $crate::SuiteError::Execution {
            page: $page.to_string(),
            message: format!($msg, $($arg),+),
            source: None,
        }
    };
    ($page:expr, $msg:expr) => {
        $crate::SuiteError::Execution {
            page: $page.to_string(),
            message: $msg.to_string(),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_configuration_error_names_field() {
        let err = config_err!("suite_name", "is mandatory");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Configuration error: `suite_name`: is mandatory");
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("fitsuite::config"));
        assert!(output.contains("suite_name"));
    }

    #[test]
    fn test_execution_error_is_not_fatal() {
        let err = exec_err!("S.T1", "exit status {}", 3);
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Execution of S.T1 failed: exit status 3");
    }

    #[test]
    fn test_verdict_failure_check_names() {
        assert_eq!(VerdictFailure::WrongAssertions(2).check_name(), "wrong");
        assert_eq!(VerdictFailure::Exceptions(1).check_name(), "exceptions");
        assert_eq!(VerdictFailure::NoTestsExecuted.check_name(), "at least one test");
    }
}
