//! Command line arguments for notebook-qa.
//!
//! Running without a subcommand is the same as `notebook-qa check`.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notebook-qa")]
#[command(about = "Run the quality-assurance pipeline over a repository's Jupyter notebooks")]
#[command(version, args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub check: CheckArgs,
}

impl Args {
    /// Selected command, `check` when none was given
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Check(self.check))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the check pipeline (default)
    Check(CheckArgs),
    /// List the checks a run would execute
    List(ListArgs),
    /// Print version and build information
    Version,
}

/// Where the pipeline definition comes from
#[derive(Debug, Clone, ClapArgs)]
pub struct SourceArgs {
    /// Repository root; checks run from here
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// QA config file (default: <root>/.github/notebook-qa.yml when present)
    #[arg(long, env = "NOTEBOOK_QA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the helper checker scripts, relative to the root
    #[arg(long)]
    pub checkers_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Notebooks to check: "all", or a comma-separated list of paths
    #[arg(long)]
    pub notebooks: Option<String>,

    /// Run only these checks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Leave these checks out
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Stop after the first failing check
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "NOTEBOOK_QA_FORMAT")]
    pub format: OutputFormat,

    /// Only show failing checks
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show tool output for every check and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Directory handed to checks for their results, relative to the root
    #[arg(long, default_value = "qa-results")]
    pub output_dir: PathBuf,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub report_file: Option<PathBuf>,

    /// Credential passed to the notebook execution check only
    #[arg(long, env = "NOTEBOOK_QA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
    /// JUnit XML for CI systems
    Junit,
}
