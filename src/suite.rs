//! Suite orchestration: configuration → discovery → execution → verdict.
//!
//! A [`SuiteRunner`] discovers its pages exactly once, when it is created.
//! Batch runs execute the whole list; child runs execute a subset of that
//! same list, one page per run, so a single child always runs exactly as it
//! would inside the batch.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{SuiteConfiguration, SuiteConfigurationBuilder};
use crate::diagnostics::VerdictFailure;
use crate::discovery::SuiteContentsFinder;
use crate::execution::{
    ClassPathBuilder, CommandTestSystem, MultipleTestsRunner, RequestContext, ResultCollector,
    SuiteSummary, TestResult, TestSystem, TestSystemListener, TestSystemRegistry,
};
use crate::prelude::*;
use crate::report::HtmlResultsRepository;
use crate::wiki::loader::load_page_tree;
use crate::wiki::{Page, PageId, PageTree};

/// Pass/fail decision for one run, with the data it was derived from.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub suite: String,
    pub summary: SuiteSummary,
    /// Per-page results in completion order.
    pub results: Vec<TestResult>,
}

impl Verdict {
    /// Each failed check, in the order wrong, exceptions, at-least-one-test.
    pub fn failures(&self) -> Vec<VerdictFailure> {
        let mut failures = Vec::new();
        if self.summary.wrong != 0 {
            failures.push(VerdictFailure::WrongAssertions(self.summary.wrong));
        }
        if self.summary.exceptions != 0 {
            failures.push(VerdictFailure::Exceptions(self.summary.exceptions));
        }
        if self.summary.pages_executed == 0 || self.summary.total() == 0 {
            failures.push(VerdictFailure::NoTestsExecuted);
        }
        failures
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn message(&self) -> String {
        let lines: Vec<String> = self
            .failures()
            .iter()
            .map(|failure| match failure {
                VerdictFailure::NoTestsExecuted => {
                    format!("at least one test executed in {}\n{}", self.suite, self.summary)
                }
                other => format!("{} in {}", other, self.suite),
            })
            .collect();
        if lines.is_empty() {
            format!("{} passed: {}", self.suite, self.summary)
        } else {
            lines.join("\n")
        }
    }

    /// The summary on success, a `SuiteError::Verdict` otherwise.
    pub fn into_result(self) -> Result<SuiteSummary, SuiteError> {
        let failures = self.failures();
        if failures.is_empty() {
            return Ok(self.summary);
        }
        Err(SuiteError::Verdict {
            message: self.message(),
            suite: self.suite,
            failures,
            summary: self.summary,
        })
    }
}

/// Runs one configured suite.
pub struct SuiteRunner {
    config: SuiteConfiguration,
    tree: Arc<PageTree>,
    children: Vec<PageId>,
    systems: TestSystemRegistry,
    listeners: Vec<Arc<dyn TestSystemListener>>,
}

impl SuiteRunner {
    /// Validates the configuration, then loads the tree with `load`.
    /// Nothing is loaded when the configuration is invalid.
    pub fn configure<F>(builder: SuiteConfigurationBuilder, load: F) -> Result<Self, SuiteError>
    where
        F: FnOnce(&SuiteConfiguration) -> Result<PageTree, SuiteError>,
    {
        let config = builder.build()?;
        let tree = load(&config)?;
        Self::new(config, Arc::new(tree))
    }

    /// Loads the page tree from the configured root directory.
    pub fn from_configuration(config: SuiteConfiguration) -> Result<Self, SuiteError> {
        let tree = load_page_tree(&config.root_path, &config.root_directory)?;
        Self::new(config, Arc::new(tree))
    }

    /// Discovers the suite's pages in `tree`.
    pub fn new(config: SuiteConfiguration, tree: Arc<PageTree>) -> Result<Self, SuiteError> {
        let filter = config.filter()?;
        let suite_root = tree.get(&config.suite_name)?;
        let children = SuiteContentsFinder::new(&tree, &filter)
            .find_all(suite_root)?
            .into_iter()
            .map(Page::id)
            .collect::<Vec<_>>();
        info!(suite = %config.suite_name, pages = children.len(), "discovered suite");

        let mut systems = TestSystemRegistry::new();
        if !config.backend_command.is_empty() {
            let command = CommandTestSystem::new(config.default_test_system.clone(), &config.backend_command)?
                .with_timeout(config.timeout);
            systems.register(Arc::new(command));
        }

        Ok(Self {
            config,
            tree,
            children,
            systems,
            listeners: Vec::new(),
        })
    }

    /// Registers (or replaces) a named test system.
    pub fn with_test_system(mut self, system: impl TestSystem + 'static) -> Self {
        self.systems.register(Arc::new(system));
        self
    }

    /// Adds a listener; listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn TestSystemListener>) {
        self.listeners.push(listener);
    }

    pub fn config(&self) -> &SuiteConfiguration {
        &self.config
    }

    pub fn suite_name(&self) -> String {
        self.config.suite_name.to_string()
    }

    /// Discovered pages in execution order.
    pub fn children(&self) -> impl Iterator<Item = &Page> + '_ {
        self.children.iter().map(|id| self.tree.page(*id))
    }

    /// Stable description of a child: its full dotted path.
    pub fn describe_child(&self, page: &Page) -> String {
        page.path().to_string()
    }

    /// Runs every discovered page as one batch.
    pub fn run(&self) -> Verdict {
        let pages: Vec<&Page> = self.children().collect();
        self.run_pages(&pages)
    }

    /// Runs one discovered page on its own.
    pub fn run_child(&self, name: &str) -> Result<Verdict, SuiteError> {
        let page = self
            .children()
            .find(|page| self.describe_child(page) == name)
            .ok_or_else(|| SuiteError::PageNotFound {
                path: name.to_string(),
            })?;
        Ok(self.run_pages(&[page]))
    }

    /// Runs each named child as its own single-page run, in discovery order.
    pub fn run_filtered<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Verdict>, SuiteError> {
        for name in names {
            if !self.children().any(|page| self.describe_child(page) == name.as_ref()) {
                return Err(SuiteError::PageNotFound {
                    path: name.as_ref().to_string(),
                });
            }
        }
        let verdicts = self
            .children()
            .filter(|page| {
                let description = self.describe_child(page);
                names.iter().any(|name| name.as_ref() == description)
            })
            .map(|page| self.run_pages(&[page]))
            .collect();
        Ok(verdicts)
    }

    fn run_pages(&self, pages: &[&Page]) -> Verdict {
        let context = RequestContext {
            class_path: ClassPathBuilder::new().build_class_path(&self.tree, pages),
            default_test_system: self.config.default_test_system.clone(),
            debug: self.config.debug,
            port: self.config.port,
        };
        let requests = pages
            .iter()
            .map(|page| context.request_for(&self.tree, page))
            .collect();

        let collector = Arc::new(ResultCollector::new());
        let repository = Arc::new(HtmlResultsRepository::new(
            self.suite_name(),
            self.config.output_dir.clone(),
        ));

        let mut runner = MultipleTestsRunner::new(requests, &self.systems).with_parallelism(self.config.parallelism);
        runner.add_test_system_listener(collector.clone());
        for listener in &self.listeners {
            runner.add_test_system_listener(listener.clone());
        }
        runner.add_test_system_listener(repository.clone());

        let summary = runner.execute_test_pages();
        for error in repository.errors() {
            warn!(suite = %self.config.suite_name, %error, "result artifact not written");
        }

        let verdict = Verdict {
            suite: self.suite_name(),
            summary,
            results: collector.results(),
        };
        info!(suite = %verdict.suite, summary = %verdict.summary, success = verdict.is_success(), "suite finished");
        verdict
    }
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("suite", &self.config.suite_name)
            .field("children", &self.children.len())
            .field("systems", &self.systems)
            .finish()
    }
}
