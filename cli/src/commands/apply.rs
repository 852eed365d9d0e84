//! Apply command implementation
//!
//! Plans the statements that bring remote in line with `internal/` and runs
//! them through pg-meta. `--dry-run` prints the plan only.

use supaform_reconcile::Reconciler;

use super::{Filters, Project, block_on, print_files, print_warnings};
use crate::error::Result;
use crate::output;

pub fn run(project: &Project, filters: &Filters, dry_run: bool) -> Result<()> {
    let ctx = filters.context(project, dry_run);
    let reconciler = Reconciler::new(project.client()?, ctx);
    let outcome = block_on(async { Ok(reconciler.apply().await?) })?;

    println!("{}", output::heading("Plan"));
    for line in outcome.report.lines() {
        println!("{}", output::plan_line(line));
    }
    println!();

    match &outcome.applied {
        None if dry_run && !outcome.plan.is_empty() => {
            println!(
                "{}",
                output::muted(&format!(
                    "dry run: {} action(s) planned, nothing applied.",
                    outcome.plan.len()
                ))
            );
        }
        None => {
            println!("{}", output::success("Remote is up to date."));
        }
        Some(applied) => {
            println!(
                "{}",
                output::success(&format!(
                    "Applied {} action(s) in {} statement(s).",
                    applied.actions, applied.statements
                ))
            );
            if !outcome.files.is_empty() {
                println!();
                println!("{}", output::heading("Regenerated sources"));
                print_files(&outcome.files, false);
            }
        }
    }
    print_warnings(&outcome.warnings);
    Ok(())
}
