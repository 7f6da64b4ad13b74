//! Handles all user-facing output for the CLI.
//!
//! Run progress is printed by a [`ConsoleListener`] attached to the suite
//! runner; search results and page listings are printed by plain functions.

use std::io::Write;
use std::sync::Mutex;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::execution::{ExecutionRequest, SuiteSummary, TestResult, TestStatus, TestSystemListener};
use crate::search::SearchResponse;
use crate::suite::Verdict;

/// Colors are used only when stdout is a terminal.
pub fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Prints one line per completed page and the final summary.
pub struct ConsoleListener {
    stdout: Mutex<StandardStream>,
}

impl ConsoleListener {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: Mutex::new(StandardStream::stdout(choice)),
        }
    }
}

impl Default for ConsoleListener {
    fn default() -> Self {
        Self::new(color_choice())
    }
}

impl TestSystemListener for ConsoleListener {
    fn test_complete(&self, _request: &ExecutionRequest, result: &TestResult) {
        let Ok(mut stdout) = self.stdout.lock() else {
            return;
        };
        let (label, color) = match result.status {
            TestStatus::Pass => ("PASS", Color::Green),
            TestStatus::Fail => ("FAIL", Color::Red),
            TestStatus::Error(_) => ("ERROR", Color::Yellow),
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(stdout, "{:<5}", label);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {} ({})", result.page, result.counts);
        if let TestStatus::Error(message) = &result.status {
            let _ = writeln!(stdout, "      {}", message);
        }
    }

    fn suite_complete(&self, summary: &SuiteSummary) {
        if let Ok(mut stdout) = self.stdout.lock() {
            let _ = stdout.set_color(ColorSpec::new().set_bold(true));
            let _ = writeln!(stdout, "Summary: {}", summary);
            let _ = stdout.reset();
        }
    }
}

/// Prints the verdict line; green on success, red otherwise.
pub fn print_verdict(verdict: &Verdict) {
    let mut stdout = StandardStream::stdout(color_choice());
    let color = if verdict.is_success() { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stdout, "{}", verdict.message());
    let _ = stdout.reset();
}

pub fn print_pages(pages: &[String]) {
    for page in pages {
        println!("{}", page);
    }
}

pub fn print_search_response(response: &SearchResponse) {
    let mut stdout = StandardStream::stdout(color_choice());
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "{}", response.title);
    let _ = stdout.reset();
    for hit in &response.hits {
        let _ = writeln!(stdout, "{}", hit.path);
    }
    let _ = writeln!(stdout, "{}", response.footer());
}
