//! CLI output helpers for consistent formatting.

use colored::Colorize;
use supaform_reconcile::WriteOutcome;

pub fn heading(text: &str) -> String {
    format!("{}", text.bright_cyan())
}

pub fn label(text: &str) -> String {
    format!("{}", text.bright_blue())
}

pub fn muted(text: &str) -> String {
    format!("{}", text.bright_black())
}

pub fn success(text: &str) -> String {
    format!("{}", text.bright_green())
}

pub fn warning(text: &str) -> String {
    format!("{}", text.yellow())
}

pub fn error(text: &str) -> String {
    format!("{}", text.red())
}

pub fn warn_line(text: &str) -> String {
    format!("[{}] {}", "Warning".yellow(), text)
}

/// One line of a rendered plan, colored by its sign.
pub fn plan_line(line: &str) -> String {
    match line.chars().next() {
        Some('+') => success(line),
        Some('-') => error(line),
        Some('~') => warning(line),
        _ => muted(line),
    }
}

/// Status column of a generated file.
pub fn file_status(outcome: WriteOutcome, dry_run: bool) -> String {
    match (outcome, dry_run) {
        (WriteOutcome::Written, false) => success("written"),
        (WriteOutcome::Written, true) => label("would write"),
        (WriteOutcome::Unchanged, _) => muted("unchanged"),
        (WriteOutcome::Skipped, _) => warning("skipped"),
    }
}
