//! Build, serve and run: module files are regenerated, then cargo takes
//! over in the project directory.

use std::ffi::OsString;
use std::process::Command;

use tracing::debug;

use super::{Filters, Project};
use crate::error::{CliError, Result};

/// What cargo is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Build,
    /// Optimized run of the project binary
    Serve,
    Run,
}

impl Task {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Self::Build => &["build"],
            Self::Serve => &["run", "--release"],
            Self::Run => &["run"],
        }
    }
}

pub fn run(project: &Project, task: Task, extra: &[String]) -> Result<()> {
    super::generate::run(project, &Filters::default())?;

    let cargo = std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo"));
    let mut command = Command::new(&cargo);
    command.current_dir(&project.root).args(task.cargo_args());
    if !extra.is_empty() {
        if task == Task::Build {
            command.args(extra);
        } else {
            command.arg("--").args(extra);
        }
    }
    debug!(?command, "delegating to cargo");

    let status = command
        .status()
        .map_err(|e| CliError::io(&project.root, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::Cargo {
            command: task.cargo_args().join(" "),
            status: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_subcommands() {
        assert_eq!(Task::Build.cargo_args(), ["build"]);
        assert_eq!(Task::Serve.cargo_args(), ["run", "--release"]);
        assert_eq!(Task::Run.cargo_args(), ["run"]);
    }
}
