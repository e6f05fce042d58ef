//! Check execution.
//!
//! Runs a pipeline of checks strictly in order, one external process at a
//! time. Later checks may read artifacts written by earlier ones.
//!
//! # Failure handling
//!
//! - Malformed check or unknown program: `validate` rejects the whole run
//!   before anything executes
//! - Non-zero exit or spawn failure: check recorded as Failed
//! - Failed check with `continue_on_failure = true`: advisory, the run goes
//!   on and the overall status is unaffected
//! - Failed check with `continue_on_failure = false`: the run fails, remaining
//!   checks are listed as not run and the report is returned
//! - Disabled check or no notebooks for a target-dependent check: Skipped
//!
//! No check is retried.

use crate::checks::{self, CheckSpec, TemplateContext};
use crate::config::QaConfig;
use crate::engine::result::{ResultAggregator, RunReport};
use crate::platform::process::{CommandExecutor, Invocation};
use crate::{CheckResult, CheckStatus, NotebookQaError, Secret};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Working directory for every check
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub checkers_dir: PathBuf,
    /// Treat every check as `continue_on_failure = false`
    pub fail_fast: bool,
    pub secret: Option<Secret>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("qa-results"),
            checkers_dir: PathBuf::from("checkers"),
            fail_fast: false,
            secret: None,
        }
    }
}

/// Sequential check runner
pub struct CheckRunner<'a> {
    config: RunnerConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> CheckRunner<'a> {
    pub fn new(config: RunnerConfig, executor: &'a dyn CommandExecutor) -> Self {
        CheckRunner { config, executor }
    }

    fn context<'n>(&'n self, notebooks: &'n [String]) -> TemplateContext<'n> {
        TemplateContext {
            notebooks,
            output_dir: &self.config.output_dir,
            checkers_dir: &self.config.checkers_dir,
        }
    }

    /// Reject the pipeline before anything runs.
    ///
    /// Every check must be well formed and every enabled check's program must
    /// resolve. Disabled checks are not resolved, so their tools need not be
    /// installed.
    pub fn validate(&self, pipeline: &[CheckSpec], qa: &QaConfig) -> Result<(), NotebookQaError> {
        checks::validate_pipeline(pipeline)?;

        for spec in pipeline {
            if qa.is_check_disabled(&spec.name) {
                continue;
            }
            self.resolve_program(spec)?;
        }
        Ok(())
    }

    /// Create the directory handed to checks as `{output_dir}`.
    pub fn prepare_output_dir(&self) -> Result<(), NotebookQaError> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir)
            .map_err(|e| NotebookQaError::io(format!("creating {}", dir.display()), e))
    }

    fn resolve_program(&self, spec: &CheckSpec) -> Result<PathBuf, NotebookQaError> {
        let program = spec.program(&self.context(&[]))?;
        self.executor
            .resolve(&program, &self.config.root)
            .ok_or_else(|| NotebookQaError::UnresolvableCommand {
                check: spec.name.clone(),
                program,
            })
    }

    /// Run the pipeline against `notebooks`.
    ///
    /// The pipeline should have passed `validate`; a check that cannot be
    /// rendered or resolved at this point is recorded as Failed.
    pub fn run(&self, pipeline: &[CheckSpec], notebooks: &[String], qa: &QaConfig) -> RunReport {
        let start = Instant::now();
        let mut aggregator =
            ResultAggregator::new(&self.config.root.to_string_lossy(), notebooks.to_vec());

        for (index, spec) in pipeline.iter().enumerate() {
            let result = self.run_check(spec, notebooks, qa);
            let halt = result.is_required_failure();
            aggregator.add_result(result);

            if halt {
                let not_run: Vec<String> = pipeline[index + 1..]
                    .iter()
                    .map(|c| c.name.clone())
                    .collect();
                if !not_run.is_empty() {
                    log::warn!(
                        "{} failed, stopping; not run: {}",
                        spec.name,
                        not_run.join(", ")
                    );
                }
                aggregator.halt(&spec.name, not_run);
                break;
            }
        }

        aggregator.finish(start.elapsed().as_millis() as u64)
    }

    /// Run a single check and record its result
    fn run_check(&self, spec: &CheckSpec, notebooks: &[String], qa: &QaConfig) -> CheckResult {
        let required = self.is_required(spec);

        if qa.is_check_disabled(&spec.name) {
            log::info!("{}: disabled by configuration", spec.name);
            return CheckResult {
                required,
                ..CheckResult::skipped(&spec.name, &spec.description, "disabled by configuration")
            };
        }

        let targets = if spec.uses_targets {
            let filtered = qa.filter_notebooks(&spec.name, notebooks);
            if filtered.is_empty() {
                log::info!("{}: no notebooks to check", spec.name);
                return CheckResult {
                    required,
                    ..CheckResult::skipped(&spec.name, &spec.description, "no notebooks to check")
                };
            }
            filtered
        } else {
            Vec::new()
        };

        let start = Instant::now();
        let invocation = match self.invocation(spec, &targets) {
            Ok(invocation) => invocation,
            Err(e) => {
                log::error!("{}: {}", spec.name, e);
                return self.failed(spec, targets, e.to_string(), None, start);
            }
        };

        log::info!("{}: running {}", spec.name, invocation.display());
        match self.executor.execute(&invocation) {
            Ok(out) if out.success => {
                log::info!("{}: passed", spec.name);
                CheckResult {
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    status: CheckStatus::Passed,
                    output: out.output,
                    reason: None,
                    exit_code: out.exit_code,
                    duration_ms: start.elapsed().as_millis() as u64,
                    notebooks: targets,
                    required,
                }
            }
            Ok(out) => {
                let reason = match out.exit_code {
                    Some(code) => format!("exited with status {}", code),
                    None => "terminated by signal".to_string(),
                };
                if required {
                    log::warn!("{}: failed ({})", spec.name, reason);
                } else {
                    log::warn!("{}: failed ({}), continuing", spec.name, reason);
                }
                let mut result = self.failed(spec, targets, reason, out.exit_code, start);
                result.output = out.output;
                result
            }
            Err(e) => {
                log::error!("{}: {}", spec.name, e);
                self.failed(spec, targets, e.to_string(), None, start)
            }
        }
    }

    fn invocation(&self, spec: &CheckSpec, targets: &[String]) -> Result<Invocation, NotebookQaError> {
        let program = self.resolve_program(spec)?;
        let args = spec.render_args(&self.context(targets))?;

        let env = match (&spec.secret_env, &self.config.secret) {
            (Some(var), Some(secret)) => vec![(var.clone(), secret.clone())],
            (Some(var), None) => {
                log::debug!("{}: no secret provided for {}", spec.name, var);
                Vec::new()
            }
            _ => Vec::new(),
        };

        Ok(Invocation {
            program: program.to_string_lossy().into_owned(),
            args,
            cwd: self.config.root.clone(),
            env,
        })
    }

    fn failed(
        &self,
        spec: &CheckSpec,
        notebooks: Vec<String>,
        reason: String,
        exit_code: Option<i32>,
        start: Instant,
    ) -> CheckResult {
        CheckResult {
            name: spec.name.clone(),
            description: spec.description.clone(),
            status: CheckStatus::Failed,
            output: String::new(),
            reason: Some(reason),
            exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
            notebooks,
            required: self.is_required(spec),
        }
    }

    /// `--fail-fast` makes every check required.
    fn is_required(&self, spec: &CheckSpec) -> bool {
        self.config.fail_fast || !spec.continue_on_failure
    }
}
