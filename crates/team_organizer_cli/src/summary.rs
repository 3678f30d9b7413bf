//! Human readable output.

use colored::Colorize;
use team_organizer_core::{RunMode, RunReport};

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;

/// Banner printed before the run starts.
pub fn format_banner(organization: &str, mode: RunMode) -> String {
    let mut output = format!("Starting Team Organizer for {}...\n", organization.bold());
    match mode {
        RunMode::Apply => output.push_str(&format!(
            "{}\n",
            "In apply mode script will make real changes!".red()
        )),
        RunMode::DryRun => output.push_str(&format!(
            "{}\n",
            "To apply changes - use \"--apply\" switch".dimmed()
        )),
    }
    output
}

/// Summary printed after the run.
pub fn format_report(report: &RunReport, mode: RunMode) -> String {
    let mut output = format!("\n{}\n", "Summary".bold().bright_cyan());

    output.push_str(&format!(
        "{}: {}\n",
        "Teams reconciled".bold(),
        report.teams_reconciled
    ));
    output.push_str(&format!(
        "{}: {}\n",
        "Repositories reconciled".bold(),
        report.repositories_reconciled
    ));
    output.push_str(&format!(
        "{}: {}\n",
        "Policy violations".bold(),
        report.stats.violations
    ));
    let changes = match mode {
        RunMode::Apply => "Changes made",
        RunMode::DryRun => "Changes planned",
    };
    output.push_str(&format!("{}: {}\n", changes.bold(), report.stats.mutations));

    if !report.unmanaged_repositories.is_empty() {
        output.push_str(&format!("\n{}\n", "Unmanaged repositories:".bold().yellow()));
        for name in &report.unmanaged_repositories {
            output.push_str(&format!("  {name}\n"));
        }
    }

    if !report.failures.is_empty() {
        output.push_str(&format!("\n{}\n", "Failures:".bold().red()));
        for failure in &report.failures {
            output.push_str(&format!(
                "  {} {}: {}\n",
                failure.kind, failure.name, failure.error
            ));
        }
    }

    if report.aborted {
        output.push_str(&format!("\n{}\n", "Run was cancelled".red()));
    } else if report.is_success() {
        output.push_str(&format!("\n{}\n", "Done".green()));
    }
    output
}
