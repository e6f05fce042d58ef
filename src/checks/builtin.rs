//! Default notebook QA pipeline.
//!
//! Order matters: formatting and linting run before execution, and the
//! checks that read executed outputs or results run after it.

use super::CheckSpec;

/// Name of the check that executes notebooks and receives the secret.
pub const EXECUTE_CHECK: &str = "execute";

/// Environment variable the execution check reads its API key from.
pub const SECRET_ENV: &str = "API_KEY";

/// The built-in pipeline, used when the QA config defines no `checks`.
pub fn default_pipeline(default_continue: bool) -> Vec<CheckSpec> {
    vec![
        CheckSpec::new("lint", &["ruff", "check", "{notebooks}"])
            .describe("Lint notebook code cells"),
        CheckSpec::new("format", &["ruff", "format", "--check", "{notebooks}"])
            .describe("Check code formatting"),
        CheckSpec::new("notebook-lint", &["pynblint", "{notebooks}"])
            .describe("Lint notebook structure and hygiene"),
        notebook_args_script("doi", "doi_checker.py").describe("Validate DOI references"),
        CheckSpec::new("links", &["pytest", "--check-links", "{notebooks}"])
            .describe("Check hyperlinks in notebooks"),
        CheckSpec::new(
            EXECUTE_CHECK,
            &[
                "mprof",
                "run",
                "--include-children",
                "jupyter",
                "nbconvert",
                "--to",
                "notebook",
                "--execute",
                "--output-dir",
                "{output_dir}/executed",
                "{notebooks}",
            ],
        )
        .describe("Execute notebooks with memory profiling")
        .secret_env(SECRET_ENV)
        .continue_on_failure(false),
        checker_script("metadata", "metadata_checker.py").describe("Check version date metadata"),
        checker_script("tests", "test_checker.py").describe("Check tests and coverage"),
        checker_script("accessibility", "accessibility_checker.py")
            .describe("Check image alt-text"),
        notebook_args_script("figures", "figure_checker.py").describe("Check figure labels"),
        CheckSpec::new("license", &["test", "-f", "LICENSE"]).describe("Check for a license file"),
        CheckSpec::new("changelog", &["test", "-f", "CHANGELOG.md"])
            .describe("Check for a changelog file"),
    ]
    .into_iter()
    .map(|spec| {
        if spec.name == EXECUTE_CHECK {
            spec
        } else {
            spec.continue_on_failure(default_continue)
        }
    })
    .collect()
}

/// Helper script taking `--notebooks <json array> --output-dir <dir>`.
fn checker_script(name: &str, script: &str) -> CheckSpec {
    let path = format!("{{checkers_dir}}/{}", script);
    CheckSpec::new(
        name,
        &[
            "python3",
            path.as_str(),
            "--notebooks",
            "{notebooks_json}",
            "--output-dir",
            "{output_dir}",
        ],
    )
}

/// Helper script taking the notebooks as positional arguments. It reads the
/// QA config from its default path under the working directory.
fn notebook_args_script(name: &str, script: &str) -> CheckSpec {
    let path = format!("{{checkers_dir}}/{}", script);
    CheckSpec::new(name, &["python3", path.as_str(), "{notebooks}"])
}
