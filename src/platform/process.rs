//! External command execution.
//!
//! Checks never spawn processes directly; they go through `CommandExecutor`
//! so runs can be tested without real tools.

use crate::{NotebookQaError, Secret};
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A fully rendered command ready to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory (the repository root)
    pub cwd: PathBuf,
    /// Extra environment; values are secrets and never logged
    pub env: Vec<(String, Secret)>,
}

impl Invocation {
    /// Command line for logs and reports. Environment values are not included.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What an external command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// None when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

/// Process execution seam.
pub trait CommandExecutor {
    /// Locate `program` as the runner would execute it from `cwd`.
    fn resolve(&self, program: &str, cwd: &Path) -> Option<PathBuf>;

    /// Run to completion and capture output.
    ///
    /// An error means the process could not be started at all.
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, NotebookQaError>;
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn resolve(&self, program: &str, cwd: &Path) -> Option<PathBuf> {
        resolve_program(program, cwd, env::var_os("PATH").as_deref())
    }

    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, NotebookQaError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null());
        for (key, value) in &invocation.env {
            cmd.env(key, value.expose());
        }

        let output = cmd
            .output()
            .map_err(|e| NotebookQaError::io(format!("spawning {}", invocation.program), e))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: text,
        })
    }
}

/// Find `program` the way a shell would.
///
/// Names containing a path separator are taken relative to `cwd`; bare names
/// are searched on `path`.
pub fn resolve_program(
    program: &str,
    cwd: &Path,
    path: Option<&std::ffi::OsStr>,
) -> Option<PathBuf> {
    if program.contains('/') || program.contains(std::path::MAIN_SEPARATOR) {
        let candidate = cwd.join(program);
        return is_executable(&candidate).then_some(candidate);
    }

    env::split_paths(path?)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
