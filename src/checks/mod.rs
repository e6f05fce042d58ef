//! Check definitions.
//!
//! A check is a named external command plus its failure policy. Commands are
//! argument lists with a small set of placeholders:
//! - `{notebooks}`: whole argument only, expands to one argument per notebook
//! - `{notebooks_json}`: JSON array of notebook paths
//! - `{output_dir}`: directory for tool results
//! - `{checkers_dir}`: directory holding the helper checker scripts
//!
//! `{{` and `}}` produce literal braces.

pub mod builtin;

use crate::NotebookQaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const NOTEBOOKS: &str = "notebooks";
const NOTEBOOKS_JSON: &str = "notebooks_json";
const OUTPUT_DIR: &str = "output_dir";
const CHECKERS_DIR: &str = "checkers_dir";

/// A named check backed by an external command. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSpec {
    pub name: String,
    pub description: String,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Keep running later checks when this one fails
    pub continue_on_failure: bool,
    /// Skip the check when there are no notebooks to hand it
    pub uses_targets: bool,
    /// Environment variable that receives the run's secret, if any
    pub secret_env: Option<String>,
}

impl CheckSpec {
    /// New check that continues on failure; target use is inferred from the command.
    pub fn new(name: &str, command: &[&str]) -> Self {
        let command: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        let uses_targets = references_notebooks(&command);
        CheckSpec {
            name: name.to_string(),
            description: String::new(),
            command,
            continue_on_failure: true,
            uses_targets,
            secret_env: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    pub fn uses_targets(mut self, uses_targets: bool) -> Self {
        self.uses_targets = uses_targets;
        self
    }

    pub fn secret_env(mut self, var: &str) -> Self {
        self.secret_env = Some(var.to_string());
        self
    }

    /// Structural validation: name, command and placeholders.
    pub fn validate(&self) -> Result<(), NotebookQaError> {
        let invalid = |message: &str| NotebookQaError::InvalidCheck {
            check: self.name.clone(),
            message: message.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(invalid("name must not contain whitespace"));
        }
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(invalid("command must not be empty"));
        }
        if let Some(var) = &self.secret_env {
            if var.is_empty() || var.contains('=') {
                return Err(invalid("secret_env must be a valid variable name"));
            }
        }

        for (index, arg) in self.command.iter().enumerate() {
            let tokens = parse_template(arg).map_err(|m| invalid(&m))?;
            let whole_notebooks = matches!(tokens.as_slice(), [Token::Placeholder(p)] if p == NOTEBOOKS);
            for token in &tokens {
                if let Token::Placeholder(p) = token {
                    if p == NOTEBOOKS && (!whole_notebooks || index == 0) {
                        return Err(invalid("{notebooks} must be a whole argument"));
                    }
                    if p == NOTEBOOKS_JSON && index == 0 {
                        return Err(invalid("{notebooks_json} cannot be the program"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Program with scalar placeholders substituted.
    pub fn program(&self, ctx: &TemplateContext<'_>) -> Result<String, NotebookQaError> {
        let first = self.command.first().ok_or_else(|| NotebookQaError::InvalidCheck {
            check: self.name.clone(),
            message: "command must not be empty".to_string(),
        })?;
        self.render_scalar(first, ctx)
    }

    /// Arguments after the program, with every placeholder expanded.
    pub fn render_args(&self, ctx: &TemplateContext<'_>) -> Result<Vec<String>, NotebookQaError> {
        let mut args = Vec::new();
        for arg in self.command.iter().skip(1) {
            let tokens = parse_template(arg).map_err(|message| NotebookQaError::InvalidCheck {
                check: self.name.clone(),
                message,
            })?;
            if matches!(tokens.as_slice(), [Token::Placeholder(p)] if p == NOTEBOOKS) {
                args.extend(ctx.notebooks.iter().cloned());
            } else {
                args.push(self.render_tokens(&tokens, ctx)?);
            }
        }
        Ok(args)
    }

    fn render_scalar(&self, arg: &str, ctx: &TemplateContext<'_>) -> Result<String, NotebookQaError> {
        let tokens = parse_template(arg).map_err(|message| NotebookQaError::InvalidCheck {
            check: self.name.clone(),
            message,
        })?;
        self.render_tokens(&tokens, ctx)
    }

    fn render_tokens(&self, tokens: &[Token], ctx: &TemplateContext<'_>) -> Result<String, NotebookQaError> {
        let mut out = String::new();
        for token in tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder(p) if p == OUTPUT_DIR => {
                    out.push_str(&ctx.output_dir.to_string_lossy())
                }
                Token::Placeholder(p) if p == CHECKERS_DIR => {
                    out.push_str(&ctx.checkers_dir.to_string_lossy())
                }
                Token::Placeholder(p) if p == NOTEBOOKS_JSON => {
                    out.push_str(&serde_json::to_string(ctx.notebooks)?)
                }
                Token::Placeholder(p) => {
                    return Err(NotebookQaError::InvalidCheck {
                        check: self.name.clone(),
                        message: format!("{{{}}} must be a whole argument", p),
                    })
                }
            }
        }
        Ok(out)
    }
}

/// Values substituted into check commands.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub notebooks: &'a [String],
    pub output_dir: &'a Path,
    pub checkers_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Placeholder(String),
}

fn parse_template(arg: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = arg.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(format!("unterminated placeholder in '{}'", arg)),
                    }
                }
                if ![NOTEBOOKS, NOTEBOOKS_JSON, OUTPUT_DIR, CHECKERS_DIR].contains(&name.as_str()) {
                    return Err(format!("unknown placeholder {{{}}}", name));
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Placeholder(name));
            }
            '}' => return Err(format!("unmatched '}}' in '{}'", arg)),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

/// True when any argument hands notebooks to the tool.
pub fn references_notebooks(command: &[String]) -> bool {
    command.iter().any(|arg| match parse_template(arg) {
        Ok(tokens) => tokens.iter().any(
            |t| matches!(t, Token::Placeholder(p) if p == NOTEBOOKS || p == NOTEBOOKS_JSON),
        ),
        Err(_) => false,
    })
}

/// Check definition as written in the QA config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub continue_on_failure: Option<bool>,
    #[serde(default)]
    pub uses_targets: Option<bool>,
    #[serde(default)]
    pub secret_env: Option<String>,
}

impl CheckEntry {
    pub fn into_spec(self, default_continue: bool) -> CheckSpec {
        let uses_targets = self
            .uses_targets
            .unwrap_or_else(|| references_notebooks(&self.command));
        CheckSpec {
            name: self.name,
            description: self.description,
            command: self.command,
            continue_on_failure: self.continue_on_failure.unwrap_or(default_continue),
            uses_targets,
            secret_env: self.secret_env,
        }
    }
}

/// Reject duplicate or malformed checks in a pipeline.
pub fn validate_pipeline(pipeline: &[CheckSpec]) -> Result<(), NotebookQaError> {
    let mut seen = HashSet::new();
    for spec in pipeline {
        spec.validate()?;
        if !seen.insert(spec.name.as_str()) {
            return Err(NotebookQaError::InvalidCheck {
                check: spec.name.clone(),
                message: "duplicate check name".to_string(),
            });
        }
    }
    Ok(())
}

/// Apply `--only` / `--skip` selection, keeping pipeline order.
pub fn select(
    pipeline: Vec<CheckSpec>,
    only: &[String],
    skip: &[String],
) -> Result<Vec<CheckSpec>, NotebookQaError> {
    for name in only.iter().chain(skip) {
        if !pipeline.iter().any(|c| &c.name == name) {
            return Err(NotebookQaError::UnknownCheck(name.clone()));
        }
    }

    Ok(pipeline
        .into_iter()
        .filter(|c| only.is_empty() || only.contains(&c.name))
        .filter(|c| !skip.contains(&c.name))
        .collect())
}
