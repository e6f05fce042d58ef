//! Output formatting for notebook-qa.
//!
//! Provides terminal, JSON, and JUnit XML output formatters.
//!
//! # Graceful Degradation
//!
//! - Non-TTY output: color disabled via NO_COLOR or --no-color
//! - Empty reports: valid output with zero checks
//! - Long tool output: the terminal report shows only the tail of a failing
//!   check's output unless --verbose is given; JSON and JUnit carry all of it
//!
//! No function in this module will panic.

use crate::cli::args::OutputFormat;
use crate::engine::result::RunReport;
use crate::{CheckResult, CheckStatus};

/// Lines of tool output shown for a failing check without --verbose
const FAILURE_TAIL_LINES: usize = 20;

const RULE: &str = "--------------------------------------------------------------------------------";

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a run report into a string
    fn format(&self, report: &RunReport) -> String;
}

/// Terminal (human-readable) formatter
pub struct TerminalFormatter {
    color: bool,
    verbose: bool,
    quiet: bool,
}

impl TerminalFormatter {
    pub fn new(color: bool, verbose: bool, quiet: bool) -> Self {
        TerminalFormatter {
            color,
            verbose,
            quiet,
        }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn status_tag(&self, status: CheckStatus) -> String {
        let tag = format!("[{}]", status);
        match status {
            CheckStatus::Passed => self.colorize(&tag, "32"),
            CheckStatus::Failed => self.colorize(&tag, "31"),
            CheckStatus::Skipped => self.colorize(&tag, "90"),
        }
    }

    fn push_check(&self, output: &mut String, check: &CheckResult) {
        let mut line = format!("  {} {}", self.status_tag(check.status), check.name);
        if !check.description.is_empty() {
            line.push_str(&format!(": {}", check.description));
        }
        match check.status {
            CheckStatus::Skipped => {
                if let Some(reason) = &check.reason {
                    line.push_str(&format!(" ({})", reason));
                }
            }
            _ if self.verbose => line.push_str(&format!(" ({}ms)", check.duration_ms)),
            _ => {}
        }
        output.push_str(&line);
        output.push('\n');

        let show_output = check.is_failed() || (self.verbose && check.status == CheckStatus::Passed);
        if !show_output {
            return;
        }
        if check.is_failed() {
            if let Some(reason) = &check.reason {
                output.push_str(&format!("      {}\n", reason));
            }
        }

        let lines: Vec<&str> = check.output.lines().collect();
        let start = if self.verbose || lines.len() <= FAILURE_TAIL_LINES {
            0
        } else {
            output.push_str(&format!(
                "      ... {} earlier line(s) omitted, use --verbose to see all\n",
                lines.len() - FAILURE_TAIL_LINES
            ));
            lines.len() - FAILURE_TAIL_LINES
        };
        for line in &lines[start..] {
            output.push_str(&format!("      | {}\n", line));
        }
    }
}

impl OutputFormatter for TerminalFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(RULE);
        output.push('\n');
        output.push_str("notebook-qa report\n");
        output.push_str(&format!("Root: {}\n", report.root));
        output.push_str(&format!("Notebooks: {}\n", report.notebooks.len()));
        if self.verbose {
            for notebook in &report.notebooks {
                output.push_str(&format!("  {}\n", notebook));
            }
        }
        output.push_str(&format!(
            "Timestamp: {}\n",
            report.timestamp.format("%Y-%m-%dT%H:%M:%SZ")
        ));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str("CHECKS\n");
        for check in &report.results {
            if self.quiet && !check.is_failed() {
                continue;
            }
            self.push_check(&mut output, check);
        }

        if !report.not_run.is_empty() {
            output.push('\n');
            output.push_str(&format!(
                "NOT RUN (halted by {})\n",
                report.halted_by.as_deref().unwrap_or("a failing check")
            ));
            for name in &report.not_run {
                output.push_str(&format!("  {}\n", self.colorize(name, "90")));
            }
        }
        output.push('\n');

        let summary = report.summary();
        output.push_str(RULE);
        output.push('\n');
        let mut line = format!(
            "SUMMARY: {} passed, {} failed, {} skipped",
            summary.passed, summary.failed, summary.skipped
        );
        if summary.not_run > 0 {
            line.push_str(&format!(", {} not run", summary.not_run));
        }
        if summary.advisory_failed > 0 {
            line.push_str(&format!(" ({} advisory)", summary.advisory_failed));
        }
        output.push_str(&line);
        output.push('\n');
        output.push_str(&format!(
            "Total time: {:.1}s\n",
            report.total_duration_ms as f64 / 1000.0
        ));

        let exit_desc = match report.exit_code() {
            0 => "all required checks passed",
            _ => "required check failed",
        };
        output.push_str(&format!("Exit code: {} ({})\n", report.exit_code(), exit_desc));
        output.push_str(RULE);

        output
    }
}

/// JSON formatter
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        JsonFormatter { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        report.to_json(self.pretty).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        })
    }
}

/// JUnit XML formatter, one testcase per check
pub struct JunitFormatter;

impl JunitFormatter {
    pub fn new() -> Self {
        JunitFormatter
    }

    fn escape_xml(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => result.push_str("&amp;"),
                '<' => result.push_str("&lt;"),
                '>' => result.push_str("&gt;"),
                '"' => result.push_str("&quot;"),
                '\'' => result.push_str("&apos;"),
                // Not representable in XML 1.0
                c if c.is_control() && !matches!(c, '\n' | '\r' | '\t') => {}
                c => result.push(c),
            }
        }
        result
    }
}

impl Default for JunitFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JunitFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let summary = report.summary();
        let tests = summary.total + summary.not_run;
        let skipped = summary.skipped + summary.not_run;
        let time = report.total_duration_ms as f64 / 1000.0;

        output.push_str(&format!(
            "<testsuites tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" time=\"{:.3}\">\n",
            tests, summary.failed, skipped, time
        ));
        output.push_str(&format!(
            "  <testsuite name=\"notebook-qa\" tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" time=\"{:.3}\" timestamp=\"{}\">\n",
            tests,
            summary.failed,
            skipped,
            time,
            report.timestamp.format("%Y-%m-%dT%H:%M:%S")
        ));

        for check in &report.results {
            output.push_str(&format!(
                "    <testcase name=\"{}\" classname=\"notebook-qa\" time=\"{:.3}\">\n",
                Self::escape_xml(&check.name),
                check.duration_ms as f64 / 1000.0
            ));
            match check.status {
                CheckStatus::Passed => {}
                CheckStatus::Failed => {
                    output.push_str(&format!(
                        "      <failure message=\"{}\">{}</failure>\n",
                        Self::escape_xml(check.reason.as_deref().unwrap_or("check failed")),
                        Self::escape_xml(&check.output)
                    ));
                }
                CheckStatus::Skipped => {
                    output.push_str(&format!(
                        "      <skipped message=\"{}\" />\n",
                        Self::escape_xml(check.reason.as_deref().unwrap_or(""))
                    ));
                }
            }
            if check.status != CheckStatus::Failed && !check.output.is_empty() {
                output.push_str(&format!(
                    "      <system-out>{}</system-out>\n",
                    Self::escape_xml(&check.output)
                ));
            }
            output.push_str("    </testcase>\n");
        }

        for name in &report.not_run {
            let halted_by = report.halted_by.as_deref().unwrap_or("a failing check");
            output.push_str(&format!(
                "    <testcase name=\"{}\" classname=\"notebook-qa\" time=\"0.000\">\n",
                Self::escape_xml(name)
            ));
            output.push_str(&format!(
                "      <skipped message=\"not run: halted by {}\" />\n",
                Self::escape_xml(halted_by)
            ));
            output.push_str("    </testcase>\n");
        }

        output.push_str("  </testsuite>\n");
        output.push_str("</testsuites>");
        output
    }
}

/// Get a formatter based on the output format
pub fn get_formatter(
    format: OutputFormat,
    no_color: bool,
    verbose: bool,
    quiet: bool,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TerminalFormatter::new(!no_color, verbose, quiet)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Junit => Box::new(JunitFormatter::new()),
    }
}
