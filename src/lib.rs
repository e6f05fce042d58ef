//! notebook-qa library
//!
//! Runs an ordered pipeline of quality-assurance checks against the Jupyter
//! notebooks of a repository. Every check is an external command-line tool;
//! this crate owns sequencing, per-check status capture, fail-fast policy and
//! the aggregated report.
//!
//! # Example
//!
//! ```no_run
//! use notebook_qa::{run_checks, RunConfig};
//!
//! let config = RunConfig::default();
//! let report = run_checks(config).expect("configuration error");
//! println!("Checks passed: {}", report.summary().passed);
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod platform;
pub mod targets;
pub mod version;

use cli::args::CheckArgs;
use config::QaConfig;
use engine::orchestrator::{CheckRunner, RunnerConfig};
use engine::result::RunReport;
use platform::process::{CommandExecutor, SystemExecutor};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use targets::TargetSelection;
use thiserror::Error;

pub use checks::CheckSpec;
pub use engine::result::{ResultSummary, RunStatus};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The tool exited with status zero
    Passed,
    /// The tool exited non-zero or could not be started
    Failed,
    /// The tool was not run (disabled, or nothing to check)
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "PASS"),
            CheckStatus::Failed => write!(f, "FAIL"),
            CheckStatus::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Result of one check in one run. Never modified once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Check name, unique within the pipeline
    pub name: String,
    /// Human-readable description of the check
    pub description: String,
    pub status: CheckStatus,
    /// Captured stdout and stderr of the tool
    pub output: String,
    /// Why the check was skipped or could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Notebooks handed to the tool
    pub notebooks: Vec<String>,
    /// A failure of this check fails the run; otherwise it is advisory
    pub required: bool,
}

impl CheckResult {
    /// A check that was not run.
    pub fn skipped(name: &str, description: &str, reason: impl Into<String>) -> Self {
        CheckResult {
            name: name.to_string(),
            description: description.to_string(),
            status: CheckStatus::Skipped,
            output: String::new(),
            reason: Some(reason.into()),
            exit_code: None,
            duration_ms: 0,
            notebooks: Vec::new(),
            required: false,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }

    /// Failed and not allowed to continue; fails the whole run.
    pub fn is_required_failure(&self) -> bool {
        self.is_failed() && self.required
    }
}

/// Error types for notebook-qa operations.
///
/// Every variant is a configuration problem detected before any check runs,
/// except `Io` and `Serialize` which may also come from report writing.
#[derive(Debug, Error)]
pub enum NotebookQaError {
    /// A check definition is malformed
    #[error("invalid check '{check}': {message}")]
    InvalidCheck { check: String, message: String },

    /// A check's program cannot be found
    #[error("check '{check}': command '{program}' not found")]
    UnresolvableCommand { check: String, program: String },

    /// A check named on the command line or in the config does not exist
    #[error("unknown check '{0}'")]
    UnknownCheck(String),

    /// An explicitly requested notebook does not exist
    #[error("notebook not found: {0}")]
    MissingTarget(String),

    /// An explicitly requested notebook resolves outside the repository root
    #[error("notebook is outside the repository root: {0}")]
    TargetOutsideRoot(String),

    /// The QA configuration file is unreadable or invalid
    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("I/O error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl NotebookQaError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        NotebookQaError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Opaque credential handed to checks that declare `secret_env`.
///
/// Never printed, logged or serialized.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Raw value, only for injecting into a child environment
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

/// Configuration for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Repository root; checks run with this as working directory
    pub root: PathBuf,
    /// Which notebooks to check
    pub targets: TargetSelection,
    /// Explicit QA config file (default: `<root>/.github/notebook-qa.yml` if present)
    pub config_path: Option<PathBuf>,
    /// Run only these checks (by name)
    pub only_checks: Vec<String>,
    /// Leave these checks out of the pipeline (by name)
    pub skip_checks: Vec<String>,
    /// Stop after the first failing check regardless of its policy
    pub fail_fast: bool,
    /// Directory handed to tools as `{output_dir}`
    pub output_dir: PathBuf,
    /// Overrides `checkers_dir` from the config file
    pub checkers_dir: Option<PathBuf>,
    pub secret: Option<Secret>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            root: PathBuf::from("."),
            targets: TargetSelection::All,
            config_path: None,
            only_checks: Vec::new(),
            skip_checks: Vec::new(),
            fail_fast: false,
            output_dir: PathBuf::from("qa-results"),
            checkers_dir: None,
            secret: None,
        }
    }
}

impl RunConfig {
    /// Create configuration from command line arguments
    pub fn from_args(args: &CheckArgs) -> Self {
        RunConfig {
            root: args.source.root.clone(),
            targets: TargetSelection::parse(args.notebooks.as_deref().unwrap_or("")),
            config_path: args.source.config.clone(),
            only_checks: args.only.clone(),
            skip_checks: args.skip.clone(),
            fail_fast: args.fail_fast,
            output_dir: args.output_dir.clone(),
            checkers_dir: args.source.checkers_dir.clone(),
            secret: args.api_key.clone().map(Secret::new),
        }
    }
}

/// Load the QA config and select the pipeline a run would execute.
pub fn load_pipeline(
    root: &Path,
    config_path: Option<&Path>,
    only: &[String],
    skip: &[String],
) -> Result<(QaConfig, Vec<CheckSpec>), NotebookQaError> {
    let qa = QaConfig::load(root, config_path)?;
    let pipeline = checks::select(qa.pipeline()?, only, skip)?;
    Ok((qa, pipeline))
}

/// Run the pipeline with the system process executor.
///
/// Returns a `RunReport` for every run that got past configuration, whether
/// checks passed or not. A `NotebookQaError` means nothing was executed.
pub fn run_checks(config: RunConfig) -> Result<RunReport, NotebookQaError> {
    run_checks_with(config, &SystemExecutor)
}

/// Run the pipeline with a caller-supplied executor.
pub fn run_checks_with(
    config: RunConfig,
    executor: &dyn CommandExecutor,
) -> Result<RunReport, NotebookQaError> {
    let (qa, pipeline) = load_pipeline(
        &config.root,
        config.config_path.as_deref(),
        &config.only_checks,
        &config.skip_checks,
    )?;

    let notebooks = targets::resolve(&config.targets, &config.root)?;
    log::info!(
        "{} notebook(s) selected, {} check(s) in pipeline",
        notebooks.len(),
        pipeline.len()
    );

    let checkers_dir = config
        .checkers_dir
        .clone()
        .unwrap_or_else(|| qa.checkers_dir());

    let runner_config = RunnerConfig {
        root: config.root.clone(),
        output_dir: config.root.join(&config.output_dir),
        checkers_dir: config.root.join(checkers_dir),
        fail_fast: config.fail_fast,
        secret: config.secret,
    };

    let runner = CheckRunner::new(runner_config, executor);
    runner.validate(&pipeline, &qa)?;
    runner.prepare_output_dir()?;
    Ok(runner.run(&pipeline, &notebooks, &qa))
}
