//! HTML run artifacts written under the configured output directory.
//!
//! One `<Full.Page.Path>.html` file per executed page, and a
//! `<SuiteName>.html` index summarising the whole run.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::execution::{ExecutionRequest, SuiteSummary, TestResult, TestStatus, TestSystemListener};
use crate::prelude::*;

/// Listener persisting results as HTML files.
///
/// Write failures do not interrupt the run; they are logged and kept for
/// inspection through [`errors`](Self::errors).
#[derive(Debug)]
pub struct HtmlResultsRepository {
    suite_name: String,
    output_dir: PathBuf,
    results: Mutex<Vec<TestResult>>,
    errors: Mutex<Vec<String>>,
}

impl HtmlResultsRepository {
    pub fn new(suite_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            suite_name: suite_name.into(),
            output_dir: output_dir.into(),
            results: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn page_file(&self, page: &str) -> PathBuf {
        self.output_dir.join(format!("{}.html", page))
    }

    pub fn index_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.html", self.suite_name))
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn write(&self, path: &Path, html: &str) {
        let outcome = fs::create_dir_all(&self.output_dir).and_then(|_| fs::write(path, html));
        match outcome {
            Ok(()) => debug!(file = %path.display(), "wrote result"),
            Err(e) => {
                let err = SuiteError::from(e);
                warn!(file = %path.display(), error = %err, "failed to write result");
                if let Ok(mut errors) = self.errors.lock() {
                    errors.push(format!("{}: {}", path.display(), err));
                }
            }
        }
    }
}

impl TestSystemListener for HtmlResultsRepository {
    fn test_complete(&self, request: &ExecutionRequest, result: &TestResult) {
        self.write(&self.page_file(&result.page), &render_page(request, result));
        if let Ok(mut results) = self.results.lock() {
            results.push(result.clone());
        }
    }

    fn suite_complete(&self, summary: &SuiteSummary) {
        let results = self.results.lock().map(|r| r.clone()).unwrap_or_default();
        self.write(&self.index_file(), &render_index(&self.suite_name, &results, summary));
    }
}

fn status_class(status: &TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "pass",
        TestStatus::Fail => "fail",
        TestStatus::Error(_) => "error",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(request: &ExecutionRequest, result: &TestResult) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\n<body>\n\
         <h1>{title}</h1>\n<p class=\"{class}\">{counts}</p>\n",
        title = escape(&result.page),
        class = status_class(&result.status),
        counts = result.counts,
    );
    if let TestStatus::Error(message) = &result.status {
        let _ = writeln!(html, "<pre class=\"error\">{}</pre>", escape(message));
    }
    let _ = write!(
        html,
        "<p>test system: {}</p>\n<pre class=\"content\">{}</pre>\n</body></html>\n",
        escape(&request.test_system),
        escape(&request.page.content),
    );
    html
}

fn render_index(suite_name: &str, results: &[TestResult], summary: &SuiteSummary) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><title>{suite}</title></head>\n<body>\n\
         <h1>{suite}</h1>\n<p>{summary}</p>\n<table>\n\
         <tr><th>page</th><th>right</th><th>wrong</th><th>exceptions</th></tr>\n",
        suite = escape(suite_name),
        summary = summary,
    );
    for result in results {
        let _ = writeln!(
            html,
            "<tr class=\"{class}\"><td><a href=\"{page}.html\">{page}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            result.counts.right,
            result.counts.wrong,
            result.counts.exceptions,
            class = status_class(&result.status),
            page = escape(&result.page),
        );
    }
    html.push_str("</table>\n</body></html>\n");
    html
}
