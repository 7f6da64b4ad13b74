//! fitsuite: discovers the test pages of a named suite in a page tree,
//! filters them by tags, runs them against pluggable test systems, and folds
//! the results into one verdict.

pub use crate::diagnostics::{SuiteError, VerdictFailure};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod execution;
pub mod filter;
pub mod report;
pub mod search;
pub mod suite;
pub mod wiki;

pub use crate::config::{SuiteConfiguration, SuiteConfigurationBuilder};
pub use crate::suite::{SuiteRunner, Verdict};

pub mod prelude {
    pub use crate::diagnostics::SuiteError;
    pub use crate::{config_err, exec_err};
}
