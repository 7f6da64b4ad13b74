//! A test system that runs each page in a child process.
//!
//! The request is written to the child's stdin as JSON and mirrored into
//! `FITSUITE_*` environment variables. The child reports by printing a JSON
//! object as its last non-empty stdout line:
//!
//! ```json
//! {"right": 3, "wrong": 0, "exceptions": 0}
//! ```

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::request::ExecutionRequest;
use super::system::TestSystem;
use super::TestCounts;
use crate::prelude::*;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns `program args...` once per page.
#[derive(Debug, Clone)]
pub struct CommandTestSystem {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandTestSystem {
    /// `command` is the program followed by its arguments.
    pub fn new(name: impl Into<String>, command: &[String]) -> Result<Self, SuiteError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| config_err!("backend_command", "command must not be empty"))?;
        Ok(Self {
            name: name.into(),
            program: program.clone(),
            args: args.to_vec(),
            timeout: None,
        })
    }

    /// Deadline for one invocation; a child still running after it is killed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(&self, request: &ExecutionRequest) -> Result<Child, SuiteError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("FITSUITE_PAGE", &request.full_path)
            .env("FITSUITE_TEST_SYSTEM", &request.test_system)
            .env("FITSUITE_CLASSPATH", &request.class_path)
            .env("FITSUITE_DEBUG", request.debug.to_string())
            .env("FITSUITE_PORT", request.port.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        // Own process group, so a timeout can take down grandchildren too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command.spawn().map_err(|e| SuiteError::Execution {
            page: request.full_path.clone(),
            message: format!("failed to spawn '{}': {}", self.program, e),
            source: Some(Box::new(e)),
        })
    }

    fn wait(&self, child: &mut Child, request: &ExecutionRequest) -> Result<std::process::ExitStatus, SuiteError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    terminate(child);
                    return Err(e.into());
                }
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    terminate(child);
                    return Err(exec_err!(
                        request.full_path,
                        "timed out after {} ms",
                        timeout.as_millis()
                    ));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kills the child's process group (or just the child off Unix) and reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let killed = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if !killed {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

impl TestSystem for CommandTestSystem {
    fn name(&self) -> &str {
        &self.name
    }

    /// Reader, writer and deadline run concurrently: a child that never reads
    /// its stdin, or floods its stdout first, still hits the timeout.
    fn execute(&self, request: &ExecutionRequest) -> Result<TestCounts, SuiteError> {
        let payload = serde_json::to_vec(request)?;
        let mut child = self.spawn(request)?;
        debug!(page = %request.full_path, program = %self.program, "spawned test system");

        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut output = String::new();
                stdout.read_to_string(&mut output).map(|_| output)
            })
        });

        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&payload) {
                // A child that stops reading closes the pipe early.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });

        // On timeout both threads are left to finish once the pipes close.
        let status = self.wait(&mut child, request)?;

        if let Some(handle) = writer {
            handle
                .join()
                .map_err(|_| exec_err!(request.full_path, "stdin writer panicked"))??;
        }
        let output = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| exec_err!(request.full_path, "stdout reader panicked"))??,
            None => String::new(),
        };

        match parse_report(&output) {
            Some(counts) => Ok(counts),
            None if !status.success() => Err(exec_err!(request.full_path, "test system exited with {}", status)),
            None => Err(exec_err!(request.full_path, "test system produced no report")),
        }
    }
}

/// Counts from the last non-empty stdout line, if it is a JSON report.
fn parse_report(output: &str) -> Option<TestCounts> {
    let line = output.lines().rev().find(|line| !line.trim().is_empty())?;
    serde_json::from_str(line.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::{PageSpec, PageTree};

    fn request(content: &str) -> ExecutionRequest {
        let mut builder = PageTree::builder();
        builder.add_child(builder.root(), PageSpec::new("T").test().content(content));
        let tree = builder.build();
        let page = tree.page(tree.root().children()[0]);
        ExecutionRequest {
            page: page.read_only_data(),
            full_path: page.path().to_string(),
            test_system: "fit".to_string(),
            class_path: String::new(),
            debug: true,
            port: 80,
        }
    }

    fn shell(script: &str) -> CommandTestSystem {
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        CommandTestSystem::new("fit", &command).unwrap()
    }

    fn assert_times_out(content: &str) {
        let system = shell("sleep 5").with_timeout(Some(Duration::from_millis(200)));
        let started = Instant::now();
        let err = system.execute(&request(content)).unwrap_err();
        let elapsed = started.elapsed();
        assert!(err.to_string().contains("timed out after 200 ms"), "{err}");
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    }

    #[test]
    fn test_parse_report_last_line() {
        let output = "starting\n{\"right\": 2, \"wrong\": 1}\n\n";
        assert_eq!(parse_report(output), Some(TestCounts::new(2, 1, 0)));
        assert_eq!(parse_report("no report"), None);
        assert_eq!(parse_report(""), None);
    }

    #[test]
    fn test_empty_command_is_configuration_error() {
        let err = CommandTestSystem::new("fit", &[]).unwrap_err();
        assert!(matches!(err, SuiteError::Configuration { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_reports_counts_from_stdout() {
        let system = shell(r#"cat >/dev/null; echo starting; echo '{"right":3,"exceptions":1}'"#);
        let counts = system.execute(&request("|check|")).unwrap();
        assert_eq!(counts, TestCounts::new(3, 0, 1));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_with_small_page() {
        assert_times_out("small");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_when_request_exceeds_pipe_buffer() {
        assert_times_out(&"x".repeat(256 * 1024));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("survived");
        let script = format!("(sleep 1; touch '{}') & wait", marker.display());
        let system = shell(&script).with_timeout(Some(Duration::from_millis(200)));
        let err = system.execute(&request("page")).unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stdout_before_reading_stdin() {
        let script = r#"head -c 200000 /dev/zero | tr '\0' 'y'; echo; cat >/dev/null; echo '{"right":1}'"#;
        let system = shell(script).with_timeout(Some(Duration::from_secs(20)));
        let counts = system.execute(&request(&"x".repeat(256 * 1024))).unwrap();
        assert_eq!(counts, TestCounts::new(1, 0, 0));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_without_report() {
        let err = shell("exit 3").execute(&request("page")).unwrap_err();
        assert!(matches!(err, SuiteError::Execution { .. }));
        assert!(err.to_string().contains("exited with"), "{err}");
    }

    #[test]
    fn test_spawn_failure_is_execution_error() {
        let command = vec!["/nonexistent/fitsuite-backend".to_string()];
        let system = CommandTestSystem::new("fit", &command).unwrap();
        let err = system.execute(&request("page")).unwrap_err();
        assert!(matches!(err, SuiteError::Execution { ref page, .. } if page == "T"));
        assert!(err.to_string().contains("failed to spawn"), "{err}");
    }
}
