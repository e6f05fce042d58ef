//! notebook-qa CLI entry point
//!
//! Quality-assurance pipeline runner for repositories of Jupyter notebooks.
//!
//! Exit codes: 0 all required checks passed, 1 a required check failed,
//! 2 usage error, 3 configuration or runtime error.

use anyhow::{Context, Result};
use clap::Parser;
use notebook_qa::cli::args::{Args, CheckArgs, Command, ListArgs};
use notebook_qa::cli::output::get_formatter;
use notebook_qa::config::QaConfig;
use notebook_qa::version::get_build_info;
use notebook_qa::{load_pipeline, logging, run_checks, RunConfig};
use std::env;
use std::process::ExitCode;

/// Configuration or runtime error
const EXIT_ERROR: u8 = 3;

fn main() -> ExitCode {
    let command = Args::parse().into_command();

    let (verbose, quiet) = match &command {
        Command::Check(args) => (args.verbose, args.quiet),
        _ => (false, false),
    };
    logging::init(verbose, quiet);

    let result = match command {
        Command::Check(args) => run(&args),
        Command::List(args) => list(&args).map(|_| ExitCode::SUCCESS),
        Command::Version => {
            println!("{}", get_build_info());
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: &CheckArgs) -> Result<ExitCode> {
    let config = RunConfig::from_args(args);
    let report = run_checks(config).context("no checks were run")?;

    let no_color = args.no_color || env::var_os("NO_COLOR").is_some();
    let formatter = get_formatter(args.format, no_color, args.verbose, args.quiet);
    println!("{}", formatter.format(&report));

    if let Some(path) = &args.report_file {
        report.save(path)?;
        log::info!("report written to {}", path.display());
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn list(args: &ListArgs) -> Result<()> {
    let source = &args.source;
    let (qa, pipeline) = load_pipeline(&source.root, source.config.as_deref(), &[], &[])?;

    if args.json {
        let entries: Vec<_> = pipeline
            .iter()
            .map(|check| {
                serde_json::json!({
                    "name": check.name,
                    "description": check.description,
                    "command": check.command,
                    "continue_on_failure": check.continue_on_failure,
                    "uses_targets": check.uses_targets,
                    "enabled": !qa.is_check_disabled(&check.name),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    print_check_list(&qa, &pipeline);
    Ok(())
}

fn print_check_list(qa: &QaConfig, pipeline: &[notebook_qa::CheckSpec]) {
    println!("Checks, in run order:");
    println!();
    let width = pipeline.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for check in pipeline {
        let mut flags = Vec::new();
        if !check.continue_on_failure {
            flags.push("stops on failure");
        }
        if qa.is_check_disabled(&check.name) {
            flags.push("disabled");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {:width$}  {}{}", check.name, check.description, flags, width = width);
        println!("  {:width$}  $ {}", "", check.command.join(" "), width = width);
    }
}
