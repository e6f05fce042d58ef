//! QA policy file.
//!
//! Loaded from `.github/notebook-qa.yml` under the repository root unless an
//! explicit path is given:
//!
//! ```yaml
//! # Globally disable specific checks
//! disabled_checks:
//!   - lint
//!
//! # Notebooks to skip entirely (glob patterns supported)
//! skip_notebooks:
//!   - "notebooks/draft.ipynb"
//!   - "notebooks/experimental/**"
//!
//! # Per-notebook check configuration
//! notebooks:
//!   "notebooks/example.ipynb":
//!     skip:
//!       - doi
//!       - figures
//! ```
//!
//! `continue_on_failure`, `checkers_dir` and a full `checks` list may also be
//! set. With the built-in pipeline, `linter` and `formatter` are read as
//! `lint` and `format`. A missing default file means defaults; a missing explicit file is an
//! error.

use crate::checks::{self, builtin, CheckEntry, CheckSpec};
use crate::NotebookQaError;
use glob::Pattern;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Config path relative to the repository root.
pub const DEFAULT_CONFIG_PATH: &str = ".github/notebook-qa.yml";

/// Default location of the helper checker scripts, relative to the root.
pub const DEFAULT_CHECKERS_DIR: &str = "checkers";

/// Older check names accepted for the built-in pipeline.
const CHECK_ALIASES: &[(&str, &str)] = &[("linter", "lint"), ("formatter", "format")];

/// Per-notebook overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotebookOverrides {
    #[serde(default)]
    pub skip: Vec<String>,
}

/// Parsed QA policy file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QaConfig {
    #[serde(default)]
    pub disabled_checks: Vec<String>,
    #[serde(default)]
    pub skip_notebooks: Vec<String>,
    #[serde(default)]
    pub notebooks: BTreeMap<String, NotebookOverrides>,
    /// Default policy for checks that don't set `continue_on_failure`
    #[serde(default)]
    pub continue_on_failure: Option<bool>,
    #[serde(default)]
    pub checkers_dir: Option<PathBuf>,
    /// Replaces the built-in pipeline when present
    #[serde(default)]
    pub checks: Option<Vec<CheckEntry>>,
}

impl QaConfig {
    /// Load the config for `root`, from `explicit` if given.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, NotebookQaError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = root.join(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    log::debug!("No QA config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, NotebookQaError> {
        let content = fs::read_to_string(path).map_err(|e| NotebookQaError::InvalidConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            NotebookQaError::InvalidConfig { message, .. } => NotebookQaError::InvalidConfig {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        log::info!("Loaded QA config from {}", path.display());
        Ok(config)
    }

    /// Parse config text. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, NotebookQaError> {
        let invalid = |message: String| NotebookQaError::InvalidConfig {
            path: "<inline>".to_string(),
            message,
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Option<QaConfig> =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let mut config = config.unwrap_or_default();
        if config.checks.is_none() {
            config.apply_check_aliases();
        }

        let patterns = config
            .skip_notebooks
            .iter()
            .chain(config.notebooks.keys());
        for pattern in patterns {
            Pattern::new(pattern)
                .map_err(|e| invalid(format!("bad notebook pattern '{}': {}", pattern, e)))?;
        }

        Ok(config)
    }

    /// Rewrite aliased names in `disabled_checks` and per-notebook `skip` lists.
    fn apply_check_aliases(&mut self) {
        let names = self
            .disabled_checks
            .iter_mut()
            .chain(self.notebooks.values_mut().flat_map(|o| o.skip.iter_mut()));
        for name in names {
            let alias = CHECK_ALIASES.iter().find(|(alias, _)| *alias == name.as_str());
            if let Some((_, canonical)) = alias {
                log::debug!("Check name '{}' read as '{}'", name, canonical);
                *name = canonical.to_string();
            }
        }
    }

    /// The pipeline this config selects, validated.
    ///
    /// Names in `disabled_checks` and per-notebook `skip` lists must refer to
    /// checks in the pipeline.
    pub fn pipeline(&self) -> Result<Vec<CheckSpec>, NotebookQaError> {
        let default_continue = self.default_continue();
        let pipeline = match &self.checks {
            Some(entries) => entries
                .iter()
                .cloned()
                .map(|e| e.into_spec(default_continue))
                .collect(),
            None => builtin::default_pipeline(default_continue),
        };
        checks::validate_pipeline(&pipeline)?;

        let referenced = self
            .disabled_checks
            .iter()
            .chain(self.notebooks.values().flat_map(|o| o.skip.iter()));
        for name in referenced {
            if !pipeline.iter().any(|c| &c.name == name) {
                return Err(NotebookQaError::UnknownCheck(name.clone()));
            }
        }

        Ok(pipeline)
    }

    pub fn default_continue(&self) -> bool {
        self.continue_on_failure.unwrap_or(true)
    }

    pub fn checkers_dir(&self) -> PathBuf {
        self.checkers_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKERS_DIR))
    }

    /// Check is globally disabled.
    pub fn is_check_disabled(&self, check: &str) -> bool {
        self.disabled_checks.iter().any(|c| c == check)
    }

    /// Notebook is excluded from every check.
    pub fn is_notebook_skipped(&self, notebook: &str) -> bool {
        self.skip_notebooks.iter().any(|p| matches(p, notebook))
    }

    /// Notebook is excluded from this check only.
    pub fn is_check_skipped_for_notebook(&self, check: &str, notebook: &str) -> bool {
        self.notebooks
            .iter()
            .any(|(pattern, o)| matches(pattern, notebook) && o.skip.iter().any(|c| c == check))
    }

    /// Notebooks a check should receive, in input order.
    pub fn filter_notebooks(&self, check: &str, notebooks: &[String]) -> Vec<String> {
        notebooks
            .iter()
            .filter(|nb| !self.is_notebook_skipped(nb))
            .filter(|nb| !self.is_check_skipped_for_notebook(check, nb))
            .cloned()
            .collect()
    }
}

fn matches(pattern: &str, notebook: &str) -> bool {
    Pattern::new(pattern)
        .map(|p| p.matches(notebook))
        .unwrap_or(false)
}
