//! CLI command implementations
//!
//! Each command module implements one `supaform` subcommand. The pipeline
//! commands (`generate`, `imports`, `apply`) share [`Filters`] and load the
//! project through [`Project::load`].

pub mod apply;
pub mod cargo;
pub mod configure;
pub mod generate;
pub mod imports;
pub mod start;

use std::future::Future;
use std::path::{Path, PathBuf};

use supaform_reconcile::{Context, FileReport, PgMetaClient, Selection};

use crate::config::{CONFIG_FILE, Config};
use crate::error::{CliError, Result};
use crate::output;

/// Resource filters shared by the pipeline commands
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Filters {
    /// Schemas to work on, overriding `allowed_schemas`
    #[arg(long = "schema", value_delimiter = ',', value_name = "SCHEMA")]
    pub schemas: Vec<String>,

    /// Only models (tables, columns, relations, policies) and types
    #[arg(long)]
    pub models_only: bool,

    /// Only roles
    #[arg(long)]
    pub roles_only: bool,

    /// Only functions
    #[arg(long)]
    pub rpc_only: bool,

    /// Only storage buckets
    #[arg(long)]
    pub storages_only: bool,

    /// Overwrite files that lack the generated-code marker
    #[arg(long)]
    pub force: bool,
}

impl Filters {
    pub fn selection(&self) -> Selection {
        Selection::only(
            self.models_only,
            self.roles_only,
            self.rpc_only,
            self.storages_only,
        )
    }

    pub fn context(&self, project: &Project, dry_run: bool) -> Context {
        let schemas = if self.schemas.is_empty() {
            project.config.schemas()
        } else {
            self.schemas.clone()
        };
        Context::new(&project.root)
            .with_schemas(schemas)
            .with_selection(self.selection())
            .dry_run(dry_run)
            .merge_safe(!self.force)
    }
}

/// Loaded configuration and the directory holding it
#[derive(Debug, Clone)]
pub struct Project {
    pub config: Config,
    pub root: PathBuf,
}

impl Project {
    /// Load `path`, or `supaform.yaml` in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(|| PathBuf::from(CONFIG_FILE), Path::to_path_buf);
        let config = Config::load_from(&path)?;
        Ok(Self {
            config,
            root: project_root(&path),
        })
    }

    pub fn client(&self) -> Result<PgMetaClient> {
        let target = self.config.target()?;
        Ok(PgMetaClient::with_timeout(
            target,
            self.config.request_timeout(),
        )?)
    }
}

/// The directory of a config file, absolute when the working directory is
/// known.
pub fn project_root(config_path: &Path) -> PathBuf {
    let parent = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::path::absolute(&parent).unwrap_or(parent)
}

/// Drive `task` on a fresh runtime. Ctrl-C drops the task; statements
/// applied before it stay applied.
pub fn block_on<T>(task: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Other(format!("failed to start async runtime: {e}")))?;
    runtime.block_on(async {
        tokio::select! {
            result = task => result,
            _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
        }
    })
}

pub(crate) fn print_files(files: &[FileReport], dry_run: bool) {
    for file in files {
        println!(
            "  {:<12} {}",
            output::file_status(file.outcome, dry_run),
            file.path.display()
        );
    }
}

pub(crate) fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{}", output::warn_line(warning));
    }
}
