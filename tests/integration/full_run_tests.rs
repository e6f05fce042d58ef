//! Full run integration tests.
//!
//! Complete pipeline runs through `run_checks_with`: config loading, target
//! resolution, validation, fail-fast behavior and result aggregation.

use crate::mocks::{repo, FakeExecutor, Outcome, FAKE_BIN};
use notebook_qa::checks::builtin;
use notebook_qa::targets::TargetSelection;
use notebook_qa::{run_checks_with, CheckStatus, NotebookQaError, RunConfig, RunStatus, Secret};
use std::path::Path;

const ABC_PIPELINE: &str = r#"
checks:
  - name: a
    command: [tool-a, "{notebooks}"]
    continue_on_failure: true
  - name: b
    command: [tool-b, "{notebooks}"]
    continue_on_failure: false
  - name: c
    command: [tool-c, "{notebooks}"]
    continue_on_failure: true
"#;

fn config_for(root: &Path) -> RunConfig {
    RunConfig {
        root: root.to_path_buf(),
        ..Default::default()
    }
}

/// Executor that knows every program in the built-in pipeline and passes.
fn all_builtin_tools() -> FakeExecutor {
    ["ruff", "pynblint", "python3", "pytest", "mprof", "test"]
        .iter()
        .fold(FakeExecutor::new(), |exec, tool| exec.passing(tool))
}

#[test]
fn test_failure_with_stop_policy_halts_pipeline() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new()
        .failing("tool-a", 1)
        .failing("tool-b", 1)
        .passing("tool-c");

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    let statuses: Vec<_> = report.results.iter().map(|r| (r.name.as_str(), r.status)).collect();
    assert_eq!(statuses, vec![("a", CheckStatus::Failed), ("b", CheckStatus::Failed)]);
    assert_eq!(report.status(), RunStatus::Failed);
    assert_eq!(report.not_run, vec!["c".to_string()]);
    assert_eq!(exec.ran(), vec!["tool-a", "tool-b"]);
}

#[test]
fn test_all_passing_checks() {
    let dir = repo(
        &["nb.ipynb"],
        Some("checks:\n  - name: a\n    command: [tool-a]\n  - name: b\n    command: [tool-b]\n"),
    );
    let exec = FakeExecutor::new().passing("tool-a").passing("tool-b");

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| r.status == CheckStatus::Passed));
    assert_eq!(report.status(), RunStatus::Passed);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_continue_policy_records_every_check() {
    let config = ABC_PIPELINE.replace("continue_on_failure: false", "continue_on_failure: true");
    let dir = repo(&["nb.ipynb"], Some(&config));
    let exec = FakeExecutor::new()
        .failing("tool-a", 1)
        .failing("tool-b", 4)
        .passing("tool-c");

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    assert_eq!(report.results.len(), 3);
    assert!(report.not_run.is_empty());
    assert_eq!(report.summary().failed, 2);
    assert_eq!(report.summary().advisory_failed, 2);
    assert_eq!(report.get("b").unwrap().exit_code, Some(4));
    assert_eq!(report.status(), RunStatus::Passed);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_fail_fast_flag_stops_continue_checks() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new()
        .failing("tool-a", 1)
        .passing("tool-b")
        .passing("tool-c");
    let config = RunConfig {
        fail_fast: true,
        ..config_for(dir.path())
    };

    let report = run_checks_with(config, &exec).unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.halted_by.as_deref(), Some("a"));
    assert_eq!(report.not_run, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_spawn_failure_is_recorded_not_fatal() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new()
        .program("tool-a", Outcome::SpawnError)
        .passing("tool-b")
        .passing("tool-c");

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    let a = report.get("a").unwrap();
    assert_eq!(a.status, CheckStatus::Failed);
    assert!(a.reason.as_deref().unwrap().contains("spawning"));
    assert_eq!(report.results.len(), 3);
}

#[test]
fn test_unresolvable_command_aborts_before_running() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new().passing("tool-a").passing("tool-b");

    let err = run_checks_with(config_for(dir.path()), &exec).unwrap_err();

    assert!(matches!(
        err,
        NotebookQaError::UnresolvableCommand { ref check, ref program } if check == "c" && program == "tool-c"
    ));
    assert!(exec.ran().is_empty());
    assert!(!dir.path().join("qa-results").exists());
}

#[test]
fn test_malformed_check_aborts_before_running() {
    let dir = repo(
        &["nb.ipynb"],
        Some("checks:\n  - name: a\n    command: [tool-a]\n  - name: bad\n    command: []\n"),
    );
    let exec = FakeExecutor::new().passing("tool-a");

    let err = run_checks_with(config_for(dir.path()), &exec).unwrap_err();

    assert!(matches!(err, NotebookQaError::InvalidCheck { .. }));
    assert!(exec.ran().is_empty());
}

#[test]
fn test_missing_explicit_notebook_is_config_error() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new()
        .passing("tool-a")
        .passing("tool-b")
        .passing("tool-c");
    let config = RunConfig {
        targets: TargetSelection::parse("nb.ipynb,missing.ipynb"),
        ..config_for(dir.path())
    };

    let err = run_checks_with(config, &exec).unwrap_err();

    assert!(matches!(err, NotebookQaError::MissingTarget(ref p) if p == "missing.ipynb"));
    assert!(exec.ran().is_empty());
}

#[test]
fn test_empty_target_set_skips_target_checks_and_passes() {
    let dir = repo(&[], None);
    std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
    let exec = all_builtin_tools();

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    assert_eq!(report.results.len(), builtin::default_pipeline(true).len());
    for result in &report.results {
        if result.name == "license" || result.name == "changelog" {
            assert_eq!(result.status, CheckStatus::Passed, "{}", result.name);
        } else {
            assert_eq!(result.status, CheckStatus::Skipped, "{}", result.name);
            assert_eq!(result.reason.as_deref(), Some("no notebooks to check"));
        }
    }
    assert_eq!(report.status(), RunStatus::Passed);
}

#[test]
fn test_default_pipeline_runs_in_order_against_discovered_notebooks() {
    let dir = repo(&["b.ipynb", "a/first.ipynb", ".hidden/x.ipynb"], None);
    let exec = all_builtin_tools();

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    let expected: Vec<String> = builtin::default_pipeline(true)
        .into_iter()
        .map(|c| c.name)
        .collect();
    let names: Vec<String> = report.results.iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, expected);
    assert_eq!(report.notebooks, vec!["a/first.ipynb", "b.ipynb"]);

    let lint = &exec.invocations()[0];
    assert_eq!(lint.program, format!("{}/ruff", FAKE_BIN));
    assert_eq!(lint.args, vec!["check", "a/first.ipynb", "b.ipynb"]);
    assert_eq!(lint.cwd, dir.path());
    assert!(dir.path().join("qa-results").is_dir());
}

#[test]
fn test_secret_reaches_execution_check_only() {
    let dir = repo(&["nb.ipynb"], None);
    let exec = all_builtin_tools();
    let config = RunConfig {
        secret: Some(Secret::new("sk-test-value")),
        ..config_for(dir.path())
    };

    run_checks_with(config, &exec).unwrap();

    for invocation in exec.invocations() {
        let is_execute = invocation.program.ends_with("/mprof");
        if is_execute {
            assert_eq!(invocation.env.len(), 1);
            assert_eq!(invocation.env[0].0, builtin::SECRET_ENV);
            assert_eq!(invocation.env[0].1.expose(), "sk-test-value");
        } else {
            assert!(invocation.env.is_empty(), "{}", invocation.display());
        }
        assert!(!format!("{:?}", invocation).contains("sk-test-value"));
    }
}

#[test]
fn test_policy_file_disables_and_filters() {
    let config = r#"
disabled_checks: [links]
skip_notebooks: ["drafts/*"]
notebooks:
  "slow.ipynb":
    skip: [execute]
"#;
    let dir = repo(&["drafts/wip.ipynb", "fast.ipynb", "slow.ipynb"], Some(config));
    // pytest is not installed; the disabled link check must not need it
    let exec = ["ruff", "pynblint", "python3", "mprof", "test"]
        .iter()
        .fold(FakeExecutor::new(), |exec, tool| exec.passing(tool));

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    let links = report.get("links").unwrap();
    assert_eq!(links.status, CheckStatus::Skipped);
    assert_eq!(links.reason.as_deref(), Some("disabled by configuration"));

    assert_eq!(report.get("lint").unwrap().notebooks, vec!["fast.ipynb", "slow.ipynb"]);
    assert_eq!(report.get("execute").unwrap().notebooks, vec!["fast.ipynb"]);
    assert!(!exec.ran().contains(&"pytest".to_string()));
}

#[test]
fn test_only_and_skip_select_checks() {
    let dir = repo(&["nb.ipynb"], Some(ABC_PIPELINE));
    let exec = FakeExecutor::new()
        .passing("tool-a")
        .passing("tool-b")
        .passing("tool-c");

    let config = RunConfig {
        only_checks: vec!["c".to_string(), "a".to_string()],
        skip_checks: vec!["c".to_string()],
        ..config_for(dir.path())
    };
    let report = run_checks_with(config, &exec).unwrap();
    let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);

    let config = RunConfig {
        only_checks: vec!["nope".to_string()],
        ..config_for(dir.path())
    };
    assert!(matches!(
        run_checks_with(config, &exec),
        Err(NotebookQaError::UnknownCheck(ref name)) if name == "nope"
    ));
}

#[test]
fn test_config_default_policy_applies_to_unset_checks() {
    let config = r#"
continue_on_failure: false
checks:
  - name: a
    command: [tool-a]
  - name: b
    command: [tool-b]
"#;
    let dir = repo(&[], Some(config));
    let exec = FakeExecutor::new().failing("tool-a", 1).passing("tool-b");

    let report = run_checks_with(config_for(dir.path()), &exec).unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.not_run, vec!["b".to_string()]);
}

#[cfg(unix)]
#[test]
fn test_real_processes_end_to_end() {
    let config = r#"
checks:
  - name: count
    command: [sh, -c, "ls \"$@\" > {output_dir}/seen.txt", sh, "{notebooks}"]
  - name: broken
    command: ["false"]
  - name: after
    command: ["true"]
"#;
    let dir = repo(&["one.ipynb", "two.ipynb"], Some(config));

    let report = notebook_qa::run_checks(config_for(dir.path())).unwrap();

    assert_eq!(report.get("count").unwrap().status, CheckStatus::Passed);
    assert_eq!(report.get("broken").unwrap().status, CheckStatus::Failed);
    assert_eq!(report.get("after").unwrap().status, CheckStatus::Passed);
    let seen = std::fs::read_to_string(dir.path().join("qa-results/seen.txt")).unwrap();
    assert_eq!(seen, "one.ipynb\ntwo.ipynb\n");
}
