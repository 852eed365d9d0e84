//! supaform CLI - Main entry point

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use supaform_cli::commands::cargo::Task;
use supaform_cli::commands::configure::ConfigureArgs;
use supaform_cli::commands::{self, Filters, Project};
use supaform_cli::config::CONFIG_FILE;
use supaform_cli::error::CliError;
use supaform_cli::logging;

/// supaform - declarative Supabase resources for Rust projects
#[derive(Parser, Debug)]
#[command(name = "supaform")]
#[command(
    author,
    version,
    about = "Declarative Supabase resources for Rust projects",
    long_about = None
)]
struct Cli {
    /// Path to config file (default: supaform.yaml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging for every pipeline step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create supaform.yaml
    Configure {
        #[command(flatten)]
        args: ConfigureArgs,

        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Lay out a new project
    Start {
        /// Project name
        name: String,

        /// Directory to create (default: ./<name>)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        #[command(flatten)]
        args: ConfigureArgs,
    },

    /// Rewrite module and bootstrap files from the declarations in internal/
    Generate {
        #[command(flatten)]
        filters: Filters,
    },

    /// Generate sources from the remote resources
    Imports {
        /// List the files an import would touch, write nothing
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        filters: Filters,
    },

    /// Apply the declarations in internal/ to the remote
    Apply {
        /// Print the plan, apply nothing
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        filters: Filters,
    },

    /// Generate, then `cargo build`
    Build {
        /// Passed on to cargo
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Generate, then `cargo run --release`
    Serve {
        /// Passed on to the binary
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Generate, then `cargo run`
    Run {
        /// Passed on to the binary
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}: {}", "Error:".red().bold(), e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();

    match cli.command {
        Command::Configure { args, force } => {
            let path = config.map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
            commands::configure::run(&path, &args, force)
        }
        Command::Start { name, dir, args } => commands::start::run(&name, dir.as_deref(), &args),
        Command::Generate { filters } => {
            let project = Project::load(config)?;
            commands::generate::run(&project, &filters)
        }
        Command::Imports { dry_run, filters } => {
            let project = Project::load(config)?;
            commands::imports::run(&project, &filters, dry_run)
        }
        Command::Apply { dry_run, filters } => {
            let project = Project::load(config)?;
            commands::apply::run(&project, &filters, dry_run)
        }
        Command::Build { args } => {
            let project = Project::load(config)?;
            commands::cargo::run(&project, Task::Build, &args)
        }
        Command::Serve { args } => {
            let project = Project::load(config)?;
            commands::cargo::run(&project, Task::Serve, &args)
        }
        Command::Run { args } => {
            let project = Project::load(config)?;
            commands::cargo::run(&project, Task::Run, &args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filters_parse() {
        let cli = Cli::parse_from([
            "supaform",
            "apply",
            "--dry-run",
            "--schema",
            "public,storage",
            "--models-only",
            "--force",
        ]);
        let Command::Apply { dry_run, filters } = cli.command else {
            panic!("expected apply");
        };
        assert!(dry_run);
        assert_eq!(filters.schemas, ["public", "storage"]);
        assert!(filters.models_only && filters.force && !filters.roles_only);
    }
}
