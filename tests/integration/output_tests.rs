//! Output formatting integration tests.
//!
//! Formatters applied to reports produced by real pipeline runs.

use crate::mocks::{repo, FakeExecutor};
use notebook_qa::cli::args::OutputFormat;
use notebook_qa::cli::output::get_formatter;
use notebook_qa::engine::result::RunReport;
use notebook_qa::{run_checks_with, RunConfig};

const PIPELINE: &str = r#"
checks:
  - name: lint
    description: Lint code cells
    command: [linter, "{notebooks}"]
  - name: execute
    description: Execute notebooks
    command: [runner, "{notebooks}"]
    continue_on_failure: false
  - name: license
    command: [present, LICENSE]
"#;

fn failing_report() -> RunReport {
    let dir = repo(&["nb.ipynb"], Some(PIPELINE));
    let exec = FakeExecutor::new()
        .passing("linter")
        .failing("runner", 2)
        .passing("present");
    run_checks_with(
        RunConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        },
        &exec,
    )
    .unwrap()
}

#[test]
fn test_text_report() {
    let out = get_formatter(OutputFormat::Text, true, false, false).format(&failing_report());
    assert!(out.contains("[PASS] lint: Lint code cells"));
    assert!(out.contains("[FAIL] execute: Execute notebooks"));
    assert!(out.contains("exited with status 2"));
    assert!(out.contains("| runner found problems"));
    assert!(out.contains("NOT RUN (halted by execute)"));
    assert!(out.contains("  license"));
    assert!(out.contains("Exit code: 1 (required check failed)"));
}

#[test]
fn test_json_report() {
    let out = get_formatter(OutputFormat::Json, true, false, false).format(&failing_report());
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["summary"]["passed"], 1);
    assert_eq!(json["summary"]["failed"], 1);
    assert_eq!(json["summary"]["not_run"], 1);
    assert_eq!(json["results"][1]["exit_code"], 2);
    assert_eq!(json["results"][1]["notebooks"][0], "nb.ipynb");
    assert_eq!(json["notebooks"][0], "nb.ipynb");
}

#[test]
fn test_junit_report() {
    let out = get_formatter(OutputFormat::Junit, true, false, false).format(&failing_report());
    assert!(out.contains("<testsuite name=\"notebook-qa\" tests=\"3\" failures=\"1\""));
    assert!(out.contains("<failure message=\"exited with status 2\">runner found problems</failure>"));
    assert!(out.contains("<skipped message=\"not run: halted by execute\" />"));
}

#[test]
fn test_quiet_text_report_hides_passing_checks() {
    let out = get_formatter(OutputFormat::Text, true, false, true).format(&failing_report());
    assert!(!out.contains("[PASS] lint"));
    assert!(out.contains("[FAIL] execute"));
    assert!(out.contains("SUMMARY: 1 passed, 1 failed, 0 skipped, 1 not run"));
}
