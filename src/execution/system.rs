use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::request::ExecutionRequest;
use super::TestCounts;
use crate::prelude::*;

/// The backend contract: run one page and report its assertion counts.
///
/// An `Err` means the backend raised rather than reported; the runner turns
/// it into an `exceptions` outcome for that page alone.
pub trait TestSystem: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, request: &ExecutionRequest) -> Result<TestCounts, SuiteError>;
}

type ExecuteFn = dyn Fn(&ExecutionRequest) -> Result<TestCounts, SuiteError> + Send + Sync;

/// A test system backed by a closure, for embedding in-process backends.
pub struct FnTestSystem {
    name: String,
    execute: Box<ExecuteFn>,
}

impl FnTestSystem {
    pub fn new<F>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn(&ExecutionRequest) -> Result<TestCounts, SuiteError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            execute: Box::new(execute),
        }
    }
}

impl fmt::Debug for FnTestSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTestSystem").field("name", &self.name).finish()
    }
}

impl TestSystem for FnTestSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, request: &ExecutionRequest) -> Result<TestCounts, SuiteError> {
        (self.execute)(request)
    }
}

/// Named test systems available to a run.
#[derive(Clone, Default)]
pub struct TestSystemRegistry {
    systems: BTreeMap<String, Arc<dyn TestSystem>>,
}

impl TestSystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system under its own name, replacing any previous one.
    pub fn register(&mut self, system: Arc<dyn TestSystem>) {
        self.systems.insert(system.name().to_string(), system);
    }

    pub fn with(mut self, system: impl TestSystem + 'static) -> Self {
        self.register(Arc::new(system));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TestSystem>> {
        self.systems.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    /// Runs the request on the system it names.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<TestCounts, SuiteError> {
        let system = self.get(&request.test_system).ok_or_else(|| {
            exec_err!(
                request.full_path,
                "no test system named '{}' is registered",
                request.test_system
            )
        })?;
        system.execute(request)
    }
}

impl fmt::Debug for TestSystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
