//! Generate command implementation
//!
//! Reads the declarations under `internal/` and rewrites the module and
//! bootstrap files that wire them together.

use supaform_reconcile::WriteOutcome;

use super::{Filters, Project, print_files};
use crate::error::Result;
use crate::output;

pub fn run(project: &Project, filters: &Filters) -> Result<()> {
    let ctx = filters.context(project, false);
    let outcome = supaform_reconcile::generate(&ctx)?;

    println!("{}", output::heading("Generating module files"));
    print_files(&outcome.files, false);

    let written = outcome
        .files
        .iter()
        .filter(|f| f.outcome == WriteOutcome::Written)
        .count();
    println!();
    if written == 0 {
        println!("{}", output::muted("Everything up to date."));
    } else {
        println!(
            "{}",
            output::success(&format!("{written} file(s) written."))
        );
    }
    Ok(())
}
