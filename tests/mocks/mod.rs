//! Fake process layer for running pipelines without the real QA tools.
//!
//! `FakeExecutor` knows a fixed set of programs, each with a scripted
//! outcome, and records every invocation it is asked to run.

use notebook_qa::platform::process::{CommandExecutor, CommandOutput, Invocation};
use notebook_qa::NotebookQaError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory fake programs appear to live in
pub const FAKE_BIN: &str = "/fake/bin";

/// What a fake program does when run
#[derive(Debug, Clone)]
pub enum Outcome {
    Pass(String),
    Fail(i32, String),
    /// The process cannot be started
    SpawnError,
}

#[derive(Default)]
pub struct FakeExecutor {
    programs: HashMap<String, Outcome>,
    invocations: RefCell<Vec<Invocation>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, name: &str, outcome: Outcome) -> Self {
        self.programs.insert(name.to_string(), outcome);
        self
    }

    pub fn passing(self, name: &str) -> Self {
        self.program(name, Outcome::Pass(format!("{} ok", name)))
    }

    pub fn failing(self, name: &str, code: i32) -> Self {
        self.program(name, Outcome::Fail(code, format!("{} found problems", name)))
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Program base names in the order they ran
    pub fn ran(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|i| program_name(&i.program))
            .collect()
    }
}

fn program_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

impl CommandExecutor for FakeExecutor {
    fn resolve(&self, program: &str, _cwd: &Path) -> Option<PathBuf> {
        self.programs
            .contains_key(program)
            .then(|| Path::new(FAKE_BIN).join(program))
    }

    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, NotebookQaError> {
        self.invocations.borrow_mut().push(invocation.clone());
        let name = program_name(&invocation.program);
        match self.programs.get(&name) {
            Some(Outcome::Pass(output)) => Ok(CommandOutput {
                success: true,
                exit_code: Some(0),
                output: output.clone(),
            }),
            Some(Outcome::Fail(code, output)) => Ok(CommandOutput {
                success: false,
                exit_code: Some(*code),
                output: output.clone(),
            }),
            Some(Outcome::SpawnError) | None => Err(NotebookQaError::io(
                format!("spawning {}", invocation.program),
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            )),
        }
    }
}

/// Scratch repository with the given notebooks and QA config.
pub fn repo(notebooks: &[&str], config: Option<&str>) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for notebook in notebooks {
        let path = dir.path().join(notebook);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "{\"cells\": [], \"nbformat\": 4}").unwrap();
    }
    if let Some(config) = config {
        fs::create_dir_all(dir.path().join(".github")).unwrap();
        fs::write(dir.path().join(".github/notebook-qa.yml"), config).unwrap();
    }
    dir
}
