//! Result aggregation and reporting.
//!
//! Collects check results in execution order, computes the overall status
//! and serializes the report.

use crate::{CheckResult, CheckStatus, NotebookQaError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub passed: u32,
    pub failed: u32,
    /// Failed checks that were allowed to continue; these do not fail the run
    pub advisory_failed: u32,
    pub skipped: u32,
    /// Checks cut off by a fail-fast halt
    pub not_run: u32,
    pub total: u32,
    pub total_duration_ms: u64,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl RunStatus {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::Failed => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Passed => write!(f, "passed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Report of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub root: String,
    /// Notebooks the run examined, before per-check filtering
    pub notebooks: Vec<String>,
    /// One entry per check that ran or was skipped, in pipeline order
    pub results: Vec<CheckResult>,
    /// Check whose failure halted the pipeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_by: Option<String>,
    /// Checks after the halt, never executed
    pub not_run: Vec<String>,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Create a new empty report
    pub fn new(root: &str, notebooks: Vec<String>) -> Self {
        RunReport {
            timestamp: Utc::now(),
            root: root.to_string(),
            notebooks,
            results: Vec::new(),
            halted_by: None,
            not_run: Vec::new(),
            total_duration_ms: 0,
        }
    }

    /// Calculate summary statistics
    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for result in &self.results {
            summary.total += 1;
            summary.total_duration_ms += result.duration_ms;
            match result.status {
                CheckStatus::Passed => summary.passed += 1,
                CheckStatus::Failed => {
                    summary.failed += 1;
                    if !result.required {
                        summary.advisory_failed += 1;
                    }
                }
                CheckStatus::Skipped => summary.skipped += 1,
            }
        }
        summary.not_run = self.not_run.len() as u32;

        summary
    }

    /// Failed if a required check failed, passed otherwise.
    ///
    /// Advisory failures (checks that continue on failure) are reported but
    /// do not change the outcome.
    pub fn status(&self) -> RunStatus {
        if self.results.iter().any(CheckResult::is_required_failure) {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.status().exit_code()
    }

    /// Only failed checks
    pub fn failures(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.is_failed()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// JSON document with the summary and overall status included.
    pub fn to_json(&self, pretty: bool) -> Result<String, NotebookQaError> {
        let document = JsonReport {
            status: self.status(),
            summary: self.summary(),
            report: self,
        };
        let json = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }

    /// Write the JSON report to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), NotebookQaError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| NotebookQaError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::write(path, self.to_json(true)?)
            .map_err(|e| NotebookQaError::io(format!("writing {}", path.display()), e))
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: RunStatus,
    summary: ResultSummary,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Collects results while the runner works through the pipeline.
#[derive(Debug)]
pub struct ResultAggregator {
    report: RunReport,
}

impl ResultAggregator {
    pub fn new(root: &str, notebooks: Vec<String>) -> Self {
        ResultAggregator {
            report: RunReport::new(root, notebooks),
        }
    }

    /// Add a completed check result
    pub fn add_result(&mut self, result: CheckResult) {
        self.report.results.push(result);
    }

    /// Record a fail-fast halt and the checks it cut off
    pub fn halt(&mut self, halted_by: &str, not_run: Vec<String>) {
        self.report.halted_by = Some(halted_by.to_string());
        self.report.not_run = not_run;
    }

    /// Create the final report
    pub fn finish(mut self, total_duration_ms: u64) -> RunReport {
        self.report.total_duration_ms = total_duration_ms;
        self.report
    }
}
