use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{info, warn};

use super::listener::{Listeners, TestSystemListener};
use super::request::ExecutionRequest;
use super::system::TestSystemRegistry;
use super::{SuiteSummary, TestResult};

/// Drives a batch of requests through their test systems.
///
/// Each request yields exactly one [`TestResult`]; a backend error or panic
/// becomes an `exceptions` outcome for that page and the batch carries on.
/// Sequential runs notify listeners in request order. Parallel runs may
/// notify out of order, but fold every result into the same summary.
pub struct MultipleTestsRunner<'a> {
    requests: Vec<ExecutionRequest>,
    systems: &'a TestSystemRegistry,
    listeners: Listeners,
    parallelism: usize,
}

impl<'a> MultipleTestsRunner<'a> {
    pub fn new(requests: Vec<ExecutionRequest>, systems: &'a TestSystemRegistry) -> Self {
        Self {
            requests,
            systems,
            listeners: Listeners::new(),
            parallelism: 1,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn add_test_system_listener(&mut self, listener: Arc<dyn TestSystemListener>) {
        self.listeners.add(listener);
    }

    pub fn requests(&self) -> &[ExecutionRequest] {
        &self.requests
    }

    /// Runs every request, then reports `suite_complete` with the summary.
    pub fn execute_test_pages(&self) -> SuiteSummary {
        info!(
            pages = self.requests.len(),
            parallelism = self.parallelism,
            "executing test pages"
        );

        let summary = Mutex::new(SuiteSummary::new());
        let workers = self.parallelism.min(self.requests.len());
        if workers <= 1 {
            for request in &self.requests {
                let result = self.run_one(request);
                summary.lock().unwrap_or_else(PoisonError::into_inner).add(&result);
            }
        } else {
            let next = AtomicUsize::new(0);
            thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(request) = self.requests.get(index) else {
                            break;
                        };
                        let result = self.run_one(request);
                        summary.lock().unwrap_or_else(PoisonError::into_inner).add(&result);
                    });
                }
            });
        }

        let summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.listeners.suite_complete(&summary);
        summary
    }

    fn run_one(&self, request: &ExecutionRequest) -> TestResult {
        self.listeners.test_started(request);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.systems.execute(request)));
        let result = match outcome {
            Ok(Ok(counts)) => TestResult::from_counts(request.full_path.clone(), counts),
            Ok(Err(e)) => {
                warn!(page = %request.full_path, error = %e, "test page raised");
                TestResult::from_error(request.full_path.clone(), e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(page = %request.full_path, %message, "test system panicked");
                TestResult::from_error(request.full_path.clone(), format!("test system panicked: {}", message))
            }
        };

        self.listeners.test_complete(request, &result);
        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
