use std::sync::{Arc, Mutex};

use super::request::ExecutionRequest;
use super::{SuiteSummary, TestResult};

/// Observer of a run. All methods default to no-ops.
///
/// Listeners are shared across worker threads when a run is parallel, so
/// they take `&self` and keep any state behind their own locks.
pub trait TestSystemListener: Send + Sync {
    fn test_started(&self, _request: &ExecutionRequest) {}

    fn test_complete(&self, _request: &ExecutionRequest, _result: &TestResult) {}

    fn suite_complete(&self, _summary: &SuiteSummary) {}
}

/// Ordered fan-out: every event reaches every listener in registration order.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Vec<Arc<dyn TestSystemListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn TestSystemListener>) {
        self.listeners.push(listener);
    }
}

impl TestSystemListener for Listeners {
    fn test_started(&self, request: &ExecutionRequest) {
        for listener in &self.listeners {
            listener.test_started(request);
        }
    }

    fn test_complete(&self, request: &ExecutionRequest, result: &TestResult) {
        for listener in &self.listeners {
            listener.test_complete(request, result);
        }
    }

    fn suite_complete(&self, summary: &SuiteSummary) {
        for listener in &self.listeners {
            listener.suite_complete(summary);
        }
    }
}

/// Records every result in completion order.
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Mutex<Vec<TestResult>>,
    summary: Mutex<Option<SuiteSummary>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Summary delivered by the last `suite_complete`, if any.
    pub fn summary(&self) -> Option<SuiteSummary> {
        self.summary.lock().ok().and_then(|s| *s)
    }
}

impl TestSystemListener for ResultCollector {
    fn test_complete(&self, _request: &ExecutionRequest, result: &TestResult) {
        if let Ok(mut results) = self.results.lock() {
            results.push(result.clone());
        }
    }

    fn suite_complete(&self, summary: &SuiteSummary) {
        if let Ok(mut slot) = self.summary.lock() {
            *slot = Some(*summary);
        }
    }
}
