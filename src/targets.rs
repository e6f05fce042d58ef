//! Target notebook selection.
//!
//! Notebooks are given as a comma-separated list of paths relative to the
//! repository root, or "all" (or nothing) for every notebook under it.

use crate::NotebookQaError;
use std::collections::HashSet;
use std::path::{Component, Path};

const NOTEBOOK_EXTENSION: &str = "ipynb";
const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Which notebooks a run examines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetSelection {
    /// Every notebook under the root
    #[default]
    All,
    /// These paths, relative to the root
    Paths(Vec<String>),
}

impl TargetSelection {
    /// Parse a comma-separated list. Empty entries are dropped; an empty list
    /// or the single word "all" selects everything.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return TargetSelection::All;
        }

        let mut seen = HashSet::new();
        let paths: Vec<String> = trimmed
            .split(',')
            .map(|p| normalize(p.trim()))
            .filter(|p| !p.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();

        if paths.is_empty() {
            TargetSelection::All
        } else {
            TargetSelection::Paths(paths)
        }
    }
}

/// Resolve a selection into notebook paths relative to `root`.
///
/// Explicit paths must be files below `root`; paths that are not notebooks
/// are dropped with a warning.
pub fn resolve(selection: &TargetSelection, root: &Path) -> Result<Vec<String>, NotebookQaError> {
    match selection {
        TargetSelection::All => discover(root),
        TargetSelection::Paths(paths) => {
            let canonical_root = root
                .canonicalize()
                .map_err(|_| NotebookQaError::MissingTarget(root.display().to_string()))?;
            let mut notebooks = Vec::with_capacity(paths.len());
            for path in paths {
                if Path::new(path).is_absolute() {
                    return Err(NotebookQaError::TargetOutsideRoot(path.clone()));
                }
                let candidate = root
                    .join(path)
                    .canonicalize()
                    .map_err(|_| NotebookQaError::MissingTarget(path.clone()))?;
                if !candidate.starts_with(&canonical_root) {
                    return Err(NotebookQaError::TargetOutsideRoot(path.clone()));
                }
                if !candidate.is_file() {
                    return Err(NotebookQaError::MissingTarget(path.clone()));
                }
                if is_notebook(Path::new(path)) {
                    notebooks.push(path.clone());
                } else {
                    log::warn!("Ignoring {}: not a notebook", path);
                }
            }
            Ok(notebooks)
        }
    }
}

/// Every notebook under `root`, sorted, skipping hidden directories and
/// Jupyter checkpoints.
pub fn discover(root: &Path) -> Result<Vec<String>, NotebookQaError> {
    let root = root
        .canonicalize()
        .map_err(|_| NotebookQaError::MissingTarget(root.display().to_string()))?;
    let root = root.as_path();

    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        NOTEBOOK_EXTENSION
    );
    let entries = glob::glob(&pattern).map_err(|e| NotebookQaError::InvalidConfig {
        path: root.display().to_string(),
        message: e.to_string(),
    })?;

    let mut notebooks = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Cannot read {}: {}", e.path().display(), e.error());
                continue;
            }
        };
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if is_hidden(relative) || !path.is_file() {
            continue;
        }
        notebooks.push(relative.to_string_lossy().replace('\\', "/"));
    }

    notebooks.sort();
    log::debug!("Discovered {} notebook(s) under {}", notebooks.len(), root.display());
    Ok(notebooks)
}

fn is_notebook(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(NOTEBOOK_EXTENSION))
        .unwrap_or(false)
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == CHECKPOINT_DIR || name.starts_with('.')
        }
        _ => false,
    })
}

fn normalize(path: &str) -> String {
    let mut path = path;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}
