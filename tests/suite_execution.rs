mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use fitsuite::execution::{
    ExecutionRequest, FnTestSystem, SuiteSummary, TestCounts, TestResult, TestStatus, TestSystemListener,
};
use fitsuite::wiki::{PageSpec, PageTree};
use fitsuite::{exec_err, SuiteError, SuiteRunner, VerdictFailure};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl TestSystemListener for Recorder {
    fn test_started(&self, request: &ExecutionRequest) {
        self.events.lock().unwrap().push(format!("start {}", request.full_path));
    }

    fn test_complete(&self, request: &ExecutionRequest, _result: &TestResult) {
        self.events.lock().unwrap().push(format!("complete {}", request.full_path));
    }

    fn suite_complete(&self, summary: &SuiteSummary) {
        self.events.lock().unwrap().push(format!("suite {}", summary.pages_executed));
    }
}

#[test]
fn filtered_suite_runs_only_matching_page() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).suite_filter("fast").build().unwrap();
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(common::fixed_system("fit", TestCounts::new(1, 0, 0)));

    let verdict = runner.run();
    assert_eq!(
        verdict.summary,
        SuiteSummary {
            right: 1,
            wrong: 0,
            exceptions: 0,
            pages_executed: 1,
        }
    );
    let pages: Vec<&str> = verdict.results.iter().map(|r| r.page.as_str()).collect();
    assert_eq!(pages, vec!["S.T1"]);
    assert!(verdict.is_success());
}

#[test]
fn run_without_assertions_fails_at_least_one_test() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(common::fixed_system("fit", TestCounts::new(0, 0, 0)));

    let verdict = runner.run();
    assert_eq!(verdict.summary.pages_executed, 2);
    assert_eq!(verdict.failures(), vec![VerdictFailure::NoTestsExecuted]);
    assert!(verdict.message().starts_with("at least one test executed in S"));
}

#[test]
fn empty_selection_fails_verdict() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).suite_filter("nothing").build().unwrap();
    let (system, calls) = common::counting_system("fit", TestCounts::new(1, 0, 0));
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(system);

    let verdict = runner.run();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!verdict.is_success());
    assert!(matches!(verdict.into_result(), Err(SuiteError::Verdict { .. })));
}

#[test]
fn invalid_configuration_never_loads_tree() {
    let mut loads = 0;
    let builder = fitsuite::SuiteConfiguration::builder().root_path(".").output_dir("out");
    let err = SuiteRunner::configure(builder, |_| {
        loads += 1;
        Ok(PageTree::builder().build())
    })
    .unwrap_err();
    assert!(matches!(err, SuiteError::Configuration { ref field, .. } if field == "suite_name"));
    assert_eq!(loads, 0);
}

#[test]
fn backend_errors_are_isolated_per_page() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let system = FnTestSystem::new("fit", |request: &ExecutionRequest| {
        if request.full_path == "S.T1" {
            Err(exec_err!(request.full_path.clone(), "fixture missing"))
        } else {
            Ok(TestCounts::new(2, 0, 0))
        }
    });
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(system);

    let verdict = runner.run();
    assert_eq!(verdict.summary.right, 2);
    assert_eq!(verdict.summary.exceptions, 1);
    assert_eq!(verdict.summary.pages_executed, 2);
    assert!(matches!(verdict.results[0].status, TestStatus::Error(_)));
    assert_eq!(verdict.failures(), vec![VerdictFailure::Exceptions(1)]);
}

#[test]
fn panicking_backend_counts_as_exception() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let system = FnTestSystem::new("fit", |request: &ExecutionRequest| {
        if request.full_path == "S.T2" {
            panic!("backend crashed");
        }
        Ok(TestCounts::new(1, 0, 0))
    });
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(system);

    let verdict = runner.run();
    assert_eq!(verdict.summary.right, 1);
    assert_eq!(verdict.summary.exceptions, 1);
}

#[test]
fn test_system_is_chosen_per_page() {
    let mut builder = PageTree::builder();
    let suite = builder.add_child(builder.root(), PageSpec::new("S").suite());
    builder.add_child(suite, PageSpec::new("T1").test());
    let slim = builder.add_child(
        suite,
        PageSpec::new("Slim").suite().content("!define TEST_SYSTEM {slim}\n"),
    );
    builder.add_child(slim, PageSpec::new("T2").test());
    let tree = builder.build();

    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let (fit, fit_calls) = common::counting_system("fit", TestCounts::new(1, 0, 0));
    let (slim, slim_calls) = common::counting_system("slim", TestCounts::new(1, 0, 0));
    let runner = SuiteRunner::new(config, Arc::new(tree))
        .unwrap()
        .with_test_system(fit)
        .with_test_system(slim);

    let verdict = runner.run();
    assert!(verdict.is_success());
    assert_eq!(fit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(slim_calls.load(Ordering::SeqCst), 1);
    let pages: Vec<&str> = verdict.results.iter().map(|r| r.page.as_str()).collect();
    assert_eq!(pages, vec!["S.T1", "S.Slim.T2"]);
}

#[test]
fn child_runs_execute_one_page_each_in_discovery_order() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(common::fixed_system("fit", TestCounts::new(1, 0, 0)));

    let single = runner.run_child("S.T2").unwrap();
    assert_eq!(single.summary.pages_executed, 1);
    assert_eq!(single.results[0].page, "S.T2");

    let verdicts = runner.run_filtered(&["S.T2", "S.T1"]).unwrap();
    let pages: Vec<&str> = verdicts.iter().map(|v| v.results[0].page.as_str()).collect();
    assert_eq!(pages, vec!["S.T1", "S.T2"]);

    let err = runner.run_child("S.T3").unwrap_err();
    assert!(matches!(err, SuiteError::PageNotFound { .. }));
}

#[test]
fn listeners_see_events_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let config = common::builder("S", tmp.path()).build().unwrap();
    let mut runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(common::fixed_system("fit", TestCounts::new(1, 0, 0)));
    let recorder = Arc::new(Recorder::default());
    runner.add_listener(recorder.clone());

    runner.run();
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec!["start S.T1", "complete S.T1", "start S.T2", "complete S.T2", "suite 2"]
    );
}

#[test]
fn parallel_run_matches_sequential_summary() {
    let mut builder = PageTree::builder();
    let suite = builder.add_child(builder.root(), PageSpec::new("S").suite());
    for i in 0..12 {
        builder.add_child(suite, PageSpec::new(format!("T{i}")).test());
    }
    let tree = Arc::new(builder.build());

    let system = || {
        FnTestSystem::new("fit", |request: &ExecutionRequest| {
            let wrong = usize::from(request.full_path.ends_with('3'));
            Ok(TestCounts::new(1, wrong, 0))
        })
    };

    let tmp = tempfile::tempdir().unwrap();
    let sequential = SuiteRunner::new(common::builder("S", tmp.path()).build().unwrap(), tree.clone())
        .unwrap()
        .with_test_system(system())
        .run();
    let parallel = SuiteRunner::new(
        common::builder("S", tmp.path()).parallelism(4).build().unwrap(),
        tree,
    )
    .unwrap()
    .with_test_system(system())
    .run();

    assert_eq!(sequential.summary, parallel.summary);
    assert_eq!(parallel.summary.pages_executed, 12);
    assert_eq!(parallel.results.len(), 12);
}

#[test]
fn run_writes_html_results() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("results");
    let config = common::builder("S", &output).build().unwrap();
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree()))
        .unwrap()
        .with_test_system(common::fixed_system("fit", TestCounts::new(1, 0, 0)));

    runner.run();
    assert!(output.join("S.T1.html").is_file());
    assert!(output.join("S.T2.html").is_file());
    let index = std::fs::read_to_string(output.join("S.html")).unwrap();
    assert!(index.contains("2 right, 0 wrong, 0 exceptions"));
}

#[cfg(unix)]
#[test]
fn timed_out_page_is_one_exception_and_sibling_still_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let script = r#"if [ "$FITSUITE_PAGE" = S.T1 ]; then sleep 5; fi; cat >/dev/null; echo '{"right":1}'"#;
    let config = common::builder("S", tmp.path())
        .backend_command(vec!["sh".to_string(), "-c".to_string(), script.to_string()])
        .timeout(std::time::Duration::from_millis(200))
        .build()
        .unwrap();
    let runner = SuiteRunner::new(config, Arc::new(common::fast_slow_tree())).unwrap();

    let started = std::time::Instant::now();
    let verdict = runner.run();
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert_eq!(
        verdict.summary,
        SuiteSummary {
            right: 1,
            wrong: 0,
            exceptions: 1,
            pages_executed: 2,
        }
    );
    match &verdict.results[0].status {
        TestStatus::Error(message) => assert!(message.contains("timed out after 200 ms"), "{message}"),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(verdict.failures(), vec![VerdictFailure::Exceptions(1)]);
}
