//! supaform reconciler - keeps annotated Rust items and a Supabase database in sync
//!
//! This crate provides:
//! - Introspection of remote resources over the pg-meta HTTP API
//! - Extraction of local declarations from `internal/**/*.rs`
//! - Diffing and dependency-ordered planning of CREATE/ALTER/DROP statements
//! - **Applying** a plan one statement at a time through pg-meta
//! - Generating Rust sources back from the remote state
//!
//! # Reconciling
//!
//! ```ignore
//! use supaform_reconcile::{Context, PgMetaClient, Reconciler, Target};
//!
//! let client = PgMetaClient::new(Target::Local { base_url: "http://localhost:8080".into() })?;
//! let ctx = Context::new(".").with_schemas(["public", "storage"]).dry_run(true);
//! let outcome = Reconciler::new(client, ctx).apply().await?;
//! print!("{}", outcome.report);
//! ```
//!
//! # Generated Layout
//!
//! Resources live under `internal/` in one directory per kind (`models`,
//! `roles`, `rpc`, `storages`, `types`), wired together by generated
//! `mod.rs` files and a `bootstrap` module listing every declaration.

pub mod apply;
pub mod context;
pub mod diff;
pub mod error;
pub mod extract;
pub mod generate;
pub mod grammar;
pub mod introspect;
pub mod orchestrate;
pub mod plan;
pub mod rpc;
pub mod set;
pub mod statements;

pub use apply::Applied;
pub use context::{Context, DEFAULT_SCHEMAS, SOURCE_DIRS, Selection};
pub use diff::{Change, ChangeOp, Diff, FieldDelta, diff};
pub use error::{Error, Result};
pub use extract::{SourceDecl, extract, materialize, validate};
pub use generate::{FileReport, GeneratedFile, MARKER, WriteOutcome, write_files};
pub use introspect::{Introspector, PgMetaApi, PgMetaClient, Target};
pub use orchestrate::{Outcome, Reconciler, generate};
pub use plan::{Action, Plan, plan};
pub use set::ResourceSet;
