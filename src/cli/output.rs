//! Terminal output for the CLI. `colored` honours NO_COLOR and CLICOLOR.

use std::fmt::Display;

use colored::Colorize;

use crate::domain::{SkippedEntry, ValidationIssue, ValidationReport};

pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Every validation issue, one per line under an error banner.
pub fn rejected(report: &ValidationReport) {
    error("schema is not valid");
    for item in report.issues() {
        issue(item);
    }
}

fn issue(item: &ValidationIssue) {
    let marker = match item {
        ValidationIssue::EmptyTree => "∅",
        ValidationIssue::MissingRequired { .. } => "✗",
        ValidationIssue::DuplicateName { .. } => "≠",
    };
    eprintln!("  {} {}", marker.red(), item);
}

/// A stored or imported entry that could not be turned into a node.
pub fn skipped(context: &str, entry: &SkippedEntry) {
    eprintln!(
        "{}: {} skipped {}: {}",
        "warning".yellow(),
        context,
        entry.location.bold(),
        entry.reason
    );
}

pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// `Created: <path>`, `Exported: <path>`
pub fn action(label: &str, msg: &(impl Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Schema context name above a rendered tree.
pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Uncoloured data line (tree rows, context names, config paths).
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}
