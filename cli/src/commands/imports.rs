//! Imports command implementation
//!
//! Introspects pg-meta and writes one source file per remote resource.

use supaform_reconcile::{Reconciler, WriteOutcome};

use super::{Filters, Project, block_on, print_files, print_warnings};
use crate::error::Result;
use crate::output;

pub fn run(project: &Project, filters: &Filters, dry_run: bool) -> Result<()> {
    let ctx = filters.context(project, dry_run);
    let reconciler = Reconciler::new(project.client()?, ctx);
    let outcome = block_on(async { Ok(reconciler.imports().await?) })?;

    if dry_run {
        println!("{}", output::heading("Files an import would touch"));
    } else {
        println!("{}", output::heading("Importing remote resources"));
    }
    print_files(&outcome.files, dry_run);
    print_warnings(&outcome.warnings);

    let count = |wanted: WriteOutcome| outcome.files.iter().filter(|f| f.outcome == wanted).count();
    let (written, skipped) = (count(WriteOutcome::Written), count(WriteOutcome::Skipped));
    println!();
    if dry_run {
        println!(
            "{}",
            output::muted(&format!(
                "dry run: {written} file(s) would be written, nothing changed."
            ))
        );
    } else {
        println!(
            "{}",
            output::success(&format!("{written} file(s) written, {skipped} skipped."))
        );
    }
    if skipped > 0 {
        println!(
            "{}",
            output::muted("Skipped files have no generated-code marker; pass --force to overwrite.")
        );
    }
    Ok(())
}
