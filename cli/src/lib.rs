//! supaform CLI - keeps a project's `internal/` sources and its Supabase
//! database in sync
//!
//! # Quick Start
//!
//! 1. Run `supaform start my-app` to lay out a new project, or
//!    `supaform configure` inside an existing one
//! 2. Run `supaform imports` to write the remote resources under `internal/`
//! 3. Edit the declarations, then `supaform apply --dry-run` to review the
//!    plan and `supaform apply` to run it
//!
//! # Configuration
//!
//! `supaform.yaml` in the project root:
//!
//! ```yaml
//! project_name: courses
//! deployment_target: cloud
//! project_id: abcdefghijklmnop
//! access_token: ${SUPABASE_ACCESS_TOKEN}
//! allowed_schemas: [public, storage]
//! ```
//!
//! A self-hosted database is reached through its pg-meta URL:
//!
//! ```yaml
//! project_name: courses
//! deployment_target: self_hosted
//! pg_meta_url: http://localhost:8080
//! ```
//!
//! # Commands
//!
//! - `supaform configure` - Create `supaform.yaml`
//! - `supaform start <name>` - Lay out a new project
//! - `supaform generate` - Rewrite module and bootstrap files
//! - `supaform imports` - Generate sources from the remote resources
//! - `supaform apply` - Apply local declarations to the remote
//! - `supaform build` / `serve` / `run` - Generate, then delegate to cargo

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use config::{Config, ConfigError, DeploymentTarget};
pub use error::CliError;
