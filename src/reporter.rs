//! Console reporting for run progress and the final summary.

use std::io::Write;

use colored::Colorize;

use crate::summary::RunSummary;

/// Receives run progress events and the final summary
pub trait Reporter: Send + Sync {
    /// General informational message
    fn info(&self, msg: &str);

    /// A test passed (or created its baseline)
    fn pass(&self, name: &str);

    /// A test failed, with detail
    fn fail(&self, name: &str, detail: &str);

    /// A test is being retried after a transient failure
    fn retry(&self, name: &str, attempt: u32);

    /// A non-test error occurred
    fn error(&self, msg: &str, err: &str);

    /// The run finished; present failures and totals
    fn report(&self, summary: &RunSummary);
}

fn print_summary(summary: &RunSummary) {
    if !summary.failures.is_empty() {
        println!("\n{}", "Failures:".red().bold());
        for record in &summary.failures {
            println!(
                "  {} {} ({}) [{}]",
                "✗".red(),
                record.test_name.white().bold(),
                record.url.dimmed(),
                record.kind
            );
            println!("    {}", record.detail.dimmed());
        }
    }

    let totals = format!(
        "{} passed, {} failed, {} skipped ({} total, {} focused)",
        summary.passed, summary.failed, summary.skipped, summary.total, summary.focused
    );
    let line = if summary.failed == 0 {
        totals.green().bold()
    } else {
        totals.red().bold()
    };
    println!("\n{} in {:.2}s", line, summary.duration_ms as f64 / 1000.0);
}

/// One line per test
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecReporter;

impl Reporter for SpecReporter {
    fn info(&self, msg: &str) {
        println!("{}", msg.dimmed());
    }

    fn pass(&self, name: &str) {
        println!("  {} {}", "✓".green(), name);
    }

    fn fail(&self, name: &str, detail: &str) {
        println!("  {} {} {}", "✗".red(), name, detail.dimmed());
    }

    fn retry(&self, name: &str, attempt: u32) {
        println!(
            "  {} {} {}",
            "↻".yellow(),
            name,
            format!("(retry {})", attempt).dimmed()
        );
    }

    fn error(&self, msg: &str, err: &str) {
        eprintln!("{} {}: {}", "error:".red().bold(), msg, err);
    }

    fn report(&self, summary: &RunSummary) {
        print_summary(summary);
    }
}

/// One character per test: `.` for pass, `F` for fail
#[derive(Debug, Clone, Copy, Default)]
pub struct DotReporter;

impl DotReporter {
    fn put(symbol: colored::ColoredString) {
        print!("{}", symbol);
        let _ = std::io::stdout().flush();
    }
}

impl Reporter for DotReporter {
    fn info(&self, msg: &str) {
        println!("{}", msg.dimmed());
    }

    fn pass(&self, _name: &str) {
        Self::put(".".green());
    }

    fn fail(&self, _name: &str, _detail: &str) {
        Self::put("F".red());
    }

    fn retry(&self, _name: &str, _attempt: u32) {
        Self::put("r".yellow());
    }

    fn error(&self, msg: &str, err: &str) {
        eprintln!("\n{} {}: {}", "error:".red().bold(), msg, err);
    }

    fn report(&self, summary: &RunSummary) {
        println!();
        print_summary(summary);
    }
}
