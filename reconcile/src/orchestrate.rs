//! The reconcile pipeline
//!
//! ```text
//! apply:    introspect ─┐
//!           extract ────┴─> validate ─> diff ─> plan ─> apply ─> introspect ─> generate
//! imports:  introspect ─> generate
//! generate: extract ─> module and bootstrap files
//! ```

use std::collections::HashSet;
use std::path::Path;

use tracing::{Instrument, info, info_span, warn};

use crate::apply::{Applied, apply};
use crate::context::{Context, Selection};
use crate::diff::diff;
use crate::error::Result;
use crate::extract::{SourceDecl, extract, materialize, validate};
use crate::generate::{
    FileReport, Generated, GeneratedFile, generate_remote, index_files, local_entries,
    preview_files, write_files,
};
use crate::introspect::{Introspector, PgMetaApi};
use crate::plan::{Plan, plan};
use crate::set::ResourceSet;

/// What a pipeline run did.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub plan: Plan,
    /// Rendered plan
    pub report: String,
    /// `None` for dry runs and runs without an apply step
    pub applied: Option<Applied>,
    /// Generated files and what happened to each; planned outcomes on dry runs
    pub files: Vec<FileReport>,
    pub warnings: Vec<String>,
}

/// Every declaration of the project, whatever the selection.
///
/// Declarations refer to each other across directories (an RPC names its
/// models), so the selection is applied to resources afterwards.
fn extract_all(ctx: &Context) -> Result<Vec<SourceDecl>> {
    let _span = info_span!("extract").entered();
    extract(&ctx.clone().with_selection(Selection::all()))
}

fn sync_files(files: &[GeneratedFile], ctx: &Context) -> Result<Vec<FileReport>> {
    let root: &Path = ctx.root();
    if ctx.dry_run {
        preview_files(files, root, ctx.merge_safe)
    } else {
        write_files(files, root, ctx.merge_safe)
    }
}

/// Remote resource files plus module and bootstrap files covering both
/// them and the local declarations.
///
/// A generated file is dropped when a local file other than its own target
/// already declares the same struct in the same directory.
fn merge_sources(mut generated: Generated, local: &[SourceDecl], ctx: &Context) -> Generated {
    let local_entries = local_entries(local, ctx);
    let top = |path: &Path| path.components().next().map(|c| c.as_os_str().to_owned());
    let declared_elsewhere: HashSet<_> = local_entries
        .iter()
        .map(|e| (top(&e.path), e.struct_name.clone(), e.path.clone()))
        .collect();

    let mut dropped = Vec::new();
    generated.entries.retain(|entry| {
        let clash = declared_elsewhere
            .iter()
            .any(|(dir, name, path)| {
                *dir == top(&entry.path) && *name == entry.struct_name && *path != entry.path
            });
        if clash {
            dropped.push(entry.clone());
        }
        !clash
    });
    for entry in &dropped {
        let message = format!(
            "{} is already declared locally, internal/{} not generated",
            entry.struct_name,
            entry.path.display()
        );
        warn!("{message}");
        generated.warnings.push(message);
        let path = Path::new("internal").join(&entry.path);
        generated.files.retain(|f| f.path != path);
    }

    let mut entries = generated.entries.clone();
    entries.extend(local_entries);
    generated.files.extend(index_files(&entries));
    generated
}

/// Rewrite module and bootstrap files from the local declarations.
pub fn generate(ctx: &Context) -> Result<Outcome> {
    let local = extract_all(ctx)?;
    let files = index_files(&local_entries(&local, ctx));
    let files = sync_files(&files, ctx)?;
    info!(files = files.len(), "module files generated");
    Ok(Outcome {
        files,
        ..Outcome::default()
    })
}

/// Runs the pipeline against one pg-meta endpoint.
pub struct Reconciler<A> {
    api: A,
    ctx: Context,
}

impl<A: PgMetaApi> Reconciler<A> {
    pub fn new(api: A, ctx: Context) -> Self {
        Self { api, ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Local declarations checked against the remote snapshot, and the plan
    /// bringing remote in line with them.
    fn plan_against(&self, remote: &ResourceSet) -> Result<Plan> {
        let local = extract_all(&self.ctx)?;
        let declarations: Vec<_> = local.into_iter().map(|d| d.declaration).collect();
        let declared = materialize(&declarations)?;

        let _span = info_span!("plan").entered();
        validate(&declared, remote, &self.ctx)?;
        let changes = diff(&declared, remote, &self.ctx);
        let plan = plan(&changes);
        info!(changes = changes.len(), actions = plan.len(), "plan ready");
        Ok(plan)
    }

    /// Bring remote in line with the local declarations, then regenerate
    /// sources from the new remote state.
    pub async fn apply(&self) -> Result<Outcome> {
        async {
            let remote = Introspector::snapshot(&self.api, &self.ctx).await?;
            let plan = self.plan_against(&remote)?;
            let report = plan.render();

            if self.ctx.dry_run {
                return Ok(Outcome {
                    plan,
                    report,
                    ..Outcome::default()
                });
            }
            if plan.is_empty() {
                info!("remote is up to date");
                return Ok(Outcome {
                    plan,
                    report,
                    ..Outcome::default()
                });
            }

            let applied = apply(plan.clone(), &self.api).await?;
            let imported = self.imports().await?;
            Ok(Outcome {
                plan,
                report,
                applied: Some(applied),
                files: imported.files,
                warnings: imported.warnings,
            })
        }
        .instrument(info_span!("reconcile", root = %self.ctx.root().display()))
        .await
    }

    /// Generate sources for the remote resources.
    pub async fn imports(&self) -> Result<Outcome> {
        async {
            let remote = Introspector::snapshot(&self.api, &self.ctx).await?;
            let local = extract_all(&self.ctx)?;
            let generated = {
                let _span = info_span!("generate").entered();
                merge_sources(generate_remote(&remote, &self.ctx), &local, &self.ctx)
            };
            let files = sync_files(&generated.files, &self.ctx)?;
            Ok(Outcome {
                files,
                warnings: generated.warnings,
                ..Outcome::default()
            })
        }
        .instrument(info_span!("imports"))
        .await
    }
}
