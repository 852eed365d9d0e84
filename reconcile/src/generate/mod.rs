//! Rust source from resources
//!
//! The generator is the inverse of the extractor: every remote resource
//! becomes an annotated item under `internal/`, laid out as
//!
//! ```text
//! internal/
//!   mod.rs               pub mod bootstrap; pub mod models; ...
//!   bootstrap/mod.rs     declarations() for the runtime loader
//!   models/mod.rs        mod courses; pub use courses::Courses; ...
//!   models/courses.rs
//!   roles/  rpc/  storages/  types/
//! ```
//!
//! Every file starts with [`MARKER`]. [`write_files`] only replaces files
//! carrying it unless merge-safety is turned off.

mod policy_tags;
mod relations;
pub mod render;
mod resources;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use supaform_types::{Policy, Table};
use tracing::{debug, info, warn};

use crate::context::{Context, SOURCE_DIRS};
use crate::error::{Error, Result};
use crate::extract::SourceDecl;
use crate::grammar::{is_platform_role, is_protected_schema};
use crate::rpc::infer_bindings;
use crate::set::ResourceSet;

use policy_tags::{Owner, rule_tags};
use relations::{Taken, join_fields};
use render::{bare, file_stem, ident, struct_name};
use resources::{
    ModelSource, RpcSource, render_bucket, render_function, render_model, render_role,
    render_type,
};

pub use policy_tags::RuleTags;

/// First line of every generated file.
pub const MARKER: &str = "// Code generated by supaform; DO NOT EDIT.";

/// A file to write, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Same contents already on disk
    Unchanged,
    /// Existing file without the marker, left alone
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// A declared struct and the file holding it, relative to `internal/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    pub path: PathBuf,
    pub struct_name: String,
}

/// Output of a generator pass.
#[derive(Debug, Clone, Default)]
pub struct Generated {
    pub files: Vec<GeneratedFile>,
    pub entries: Vec<Entry>,
    pub warnings: Vec<String>,
}

// =============================================================================
// Writing
// =============================================================================

fn classify(file: &GeneratedFile, root: &Path, merge_safe: bool) -> Result<WriteOutcome> {
    let full = root.join(&file.path);
    match std::fs::read(&full) {
        Ok(existing) if existing == file.contents.as_bytes() => Ok(WriteOutcome::Unchanged),
        Ok(existing) if merge_safe && !existing.starts_with(MARKER.as_bytes()) => {
            Ok(WriteOutcome::Skipped)
        }
        Ok(_) => Ok(WriteOutcome::Written),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WriteOutcome::Written),
        Err(e) => Err(Error::io(full, e)),
    }
}

/// What [`write_files`] would do, without touching the disk.
pub fn preview_files(
    files: &[GeneratedFile],
    root: &Path,
    merge_safe: bool,
) -> Result<Vec<FileReport>> {
    files
        .iter()
        .map(|file| {
            Ok(FileReport {
                path: file.path.clone(),
                outcome: classify(file, root, merge_safe)?,
            })
        })
        .collect()
}

/// Write `files` below `root`.
///
/// With `merge_safe`, an existing file that does not start with [`MARKER`]
/// is reported as [`WriteOutcome::Skipped`] and kept as is.
pub fn write_files(
    files: &[GeneratedFile],
    root: &Path,
    merge_safe: bool,
) -> Result<Vec<FileReport>> {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let outcome = classify(file, root, merge_safe)?;
        let full = root.join(&file.path);
        match outcome {
            WriteOutcome::Written => {
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                std::fs::write(&full, &file.contents).map_err(|e| Error::io(&full, e))?;
                debug!(path = %file.path.display(), "file written");
            }
            WriteOutcome::Skipped => {
                warn!(path = %file.path.display(), "file has no generated marker, skipped");
            }
            WriteOutcome::Unchanged => {}
        }
        reports.push(FileReport {
            path: file.path.clone(),
            outcome,
        });
    }
    let written = reports.iter().filter(|r| r.outcome == WriteOutcome::Written).count();
    info!(files = reports.len(), written, "generated files synced");
    Ok(reports)
}

// =============================================================================
// Remote Resources
// =============================================================================

/// Hands out `Name`, `Name2`, ... per directory.
#[derive(Default)]
struct Names(HashMap<&'static str, HashSet<String>>);

impl Names {
    fn claim(&mut self, dir: &'static str, base: String) -> String {
        let used = self.0.entry(dir).or_default();
        let mut name = base.clone();
        let mut n = 2;
        while used.contains(&name) {
            name = format!("{base}{n}");
            n += 1;
        }
        used.insert(name.clone());
        name
    }
}

struct Emitter {
    generated: Generated,
}

impl Emitter {
    fn emit(&mut self, dir: &str, struct_name: &str, contents: String) {
        let path = Path::new(dir).join(format!("{}.rs", file_stem(struct_name)));
        self.generated.files.push(GeneratedFile {
            path: Path::new("internal").join(&path),
            contents,
        });
        self.generated.entries.push(Entry {
            path,
            struct_name: struct_name.to_string(),
        });
    }
}

fn table_key(schema: &str, table: &str) -> String {
    format!("{schema}.{table}")
}

/// Source files for every resource of `remote` admitted by `ctx`.
///
/// Platform roles and objects of the protected schemas stay out. Joins and
/// RPC bindings only point at tables that get a model themselves.
pub fn generate_remote(remote: &ResourceSet, ctx: &Context) -> Generated {
    let set = remote.filtered(ctx);
    let mut names = Names::default();
    let mut out = Emitter {
        generated: Generated::default(),
    };
    let mut warnings = Vec::new();

    let modeled: Vec<&Table> = remote
        .tables
        .iter()
        .filter(|t| ctx.allows_schema(&t.schema) && !is_protected_schema(&t.schema))
        .collect();
    let mut model_names: HashMap<String, String> = HashMap::new();
    for table in &modeled {
        let name = names.claim("models", struct_name(&table.schema, &table.name));
        model_names.insert(table_key(&table.schema, &table.name), name);
    }
    let model_name = |schema: &str, table: &str| {
        model_names.get(&table_key(schema, table)).cloned()
    };

    if ctx.selection.models {
        let relations: Vec<_> = remote.relations.iter().collect();
        for table in set.tables.iter().filter(|t| !is_protected_schema(&t.schema)) {
            let Some(name) = model_name(&table.schema, &table.name) else {
                continue;
            };
            let policies: Vec<&Policy> = set
                .policies
                .iter()
                .filter(|p| !p.is_storage() && p.schema == table.schema && p.table == table.name)
                .collect();
            let rules = rule_tags(
                &policies,
                Owner::Table {
                    schema: &table.schema,
                    table: &table.name,
                },
                &mut warnings,
            );
            let mut taken = Taken::new(table.columns.iter().map(|c| ident(&c.name)));
            let joins = join_fields(table, &relations, &model_name, &mut taken);
            let code = render_model(&ModelSource {
                struct_name: &name,
                table,
                joins: &joins,
                rules: &rules,
            });
            out.emit("models", &name, code);
        }

        for pg_type in set.types.iter().filter(|t| !is_protected_schema(&t.schema)) {
            let name = names.claim("types", struct_name(&pg_type.schema, &pg_type.name));
            out.emit("types", &name, render_type(&name, pg_type));
        }
    }

    for role in set.roles.iter().filter(|r| !is_platform_role(&r.name)) {
        let name = names.claim("roles", struct_name("public", &role.name));
        out.emit("roles", &name, render_role(&name, role));
    }

    for function in set.functions.iter().filter(|f| !is_protected_schema(&f.schema)) {
        let name = names.claim("rpc", struct_name(&function.schema, &function.name));
        let (template, inferred) = infer_bindings(&function.definition, |schema, table| {
            model_name(schema, table).is_some()
        });
        let bindings: Vec<_> = inferred
            .into_iter()
            .filter_map(|b| model_name(&b.schema, &b.table).map(|model| (b, model)))
            .collect();
        let code = render_function(&RpcSource {
            struct_name: &name,
            function,
            template: &template,
            bindings: &bindings,
        });
        out.emit("rpc", &name, code);
    }

    for bucket in set.buckets.iter() {
        let policies: Vec<&Policy> = set
            .policies
            .iter()
            .filter(|p| p.bucket.as_deref() == Some(bucket.name.as_str()))
            .collect();
        let rules = rule_tags(&policies, Owner::Bucket(&bucket.name), &mut warnings);
        let name = names.claim("storages", struct_name("public", &bucket.name));
        out.emit("storages", &name, render_bucket(&name, bucket, &rules));
    }
    for policy in set.policies.iter().filter(|p| p.is_storage() && p.bucket.is_none()) {
        warnings.push(format!(
            "storage policy {} is not scoped to a bucket, not imported",
            policy.identity()
        ));
    }

    for warning in &warnings {
        warn!("{warning}");
    }
    let mut generated = out.generated;
    generated.warnings = warnings;
    info!(files = generated.files.len(), "resource sources generated");
    generated
}

// =============================================================================
// Module And Bootstrap Files
// =============================================================================

/// Entries of local declarations, relative to `internal/`.
pub fn local_entries(decls: &[SourceDecl], ctx: &Context) -> Vec<Entry> {
    let internal = ctx.internal_dir();
    decls
        .iter()
        .filter_map(|d| {
            let path = d.path.strip_prefix(&internal).ok()?;
            Some(Entry {
                path: path.to_path_buf(),
                struct_name: d.declaration.struct_name().to_string(),
            })
        })
        .collect()
}

/// Module and bootstrap files for the local declarations.
pub fn generate_local(decls: &[SourceDecl], ctx: &Context) -> Vec<GeneratedFile> {
    index_files(&local_entries(decls, ctx))
}

#[derive(Debug, Default)]
struct DirIndex {
    /// File stem to the structs it exports
    modules: BTreeMap<String, Vec<String>>,
    children: BTreeSet<String>,
}

/// Position of an entry's top-level directory in [`SOURCE_DIRS`].
fn dir_rank(path: &Path) -> usize {
    let top = path.components().next().map(|c| c.as_os_str().to_string_lossy().into_owned());
    top.and_then(|t| SOURCE_DIRS.iter().position(|d| *d == t))
        .unwrap_or(SOURCE_DIRS.len())
}

fn module_decl(stem: &str) -> String {
    let name = ident(stem);
    if bare(&name) == stem {
        format!("mod {name};\n")
    } else {
        format!("#[path = \"{stem}.rs\"]\nmod {name};\n")
    }
}

fn render_dir(index: &DirIndex) -> String {
    let mut code = format!("{MARKER}\n\n");
    for stem in index.modules.keys() {
        code.push_str(&module_decl(stem));
    }
    for child in &index.children {
        code.push_str(&module_decl(child));
    }
    code.push('\n');
    for (stem, structs) in &index.modules {
        let module = ident(stem);
        match structs.as_slice() {
            [one] => code.push_str(&format!("pub use {module}::{one};\n")),
            many => code.push_str(&format!("pub use {module}::{{{}}};\n", many.join(", "))),
        }
    }
    for child in &index.children {
        code.push_str(&format!("pub use {}::*;\n", ident(child)));
    }
    code
}

fn render_bootstrap(entries: &[&Entry], dirs: &[&str]) -> String {
    let mut code = format!("{MARKER}\n\nuse supaform::prelude::*;\n\n");
    match dirs {
        [] => {}
        [one] => code.push_str(&format!("use super::{one};\n\n")),
        many => code.push_str(&format!("use super::{{{}}};\n\n", many.join(", "))),
    }
    code.push_str("/// Every declaration of the project, in registration order.\n");
    code.push_str("pub fn declarations() -> Vec<Declaration> {\n");
    if entries.is_empty() {
        code.push_str("    Vec::new()\n");
    } else {
        code.push_str("    vec![\n");
        for entry in entries {
            let top = entry
                .path
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            code.push_str(&format!("        {top}::{}::declaration(),\n", entry.struct_name));
        }
        code.push_str("    ]\n");
    }
    code.push_str("}\n");
    code
}

/// `mod.rs` files for every directory holding entries, `internal/mod.rs`
/// and `internal/bootstrap/mod.rs`.
pub fn index_files(entries: &[Entry]) -> Vec<GeneratedFile> {
    let mut entries: Vec<&Entry> = entries
        .iter()
        .filter(|e| {
            e.path.file_stem().is_some_and(|s| s != "mod")
                && dir_rank(&e.path) < SOURCE_DIRS.len()
        })
        .collect();
    entries.sort_by(|a, b| {
        dir_rank(&a.path)
            .cmp(&dir_rank(&b.path))
            .then_with(|| a.path.cmp(&b.path))
    });
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert((e.path.clone(), e.struct_name.clone())));

    let mut dirs: BTreeMap<PathBuf, DirIndex> = BTreeMap::new();
    for entry in &entries {
        let (Some(dir), Some(stem)) = (entry.path.parent(), entry.path.file_stem()) else {
            continue;
        };
        let structs = dirs
            .entry(dir.to_path_buf())
            .or_default()
            .modules
            .entry(stem.to_string_lossy().into_owned())
            .or_default();
        if !structs.contains(&entry.struct_name) {
            structs.push(entry.struct_name.clone());
        }

        let mut child = dir;
        while let Some(parent) = child.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Some(name) = child.file_name() {
                dirs.entry(parent.to_path_buf())
                    .or_default()
                    .children
                    .insert(name.to_string_lossy().into_owned());
            }
            child = parent;
        }
    }

    let internal = Path::new("internal");
    let mut files: Vec<GeneratedFile> = dirs
        .iter()
        .map(|(dir, index)| GeneratedFile {
            path: internal.join(dir).join("mod.rs"),
            contents: render_dir(index),
        })
        .collect();

    let top: Vec<&str> = SOURCE_DIRS
        .iter()
        .copied()
        .filter(|d| dirs.contains_key(Path::new(d)))
        .collect();
    let mut root = format!("{MARKER}\n\npub mod bootstrap;\n");
    for dir in &top {
        root.push_str(&format!("pub mod {dir};\n"));
    }
    files.push(GeneratedFile {
        path: internal.join("mod.rs"),
        contents: root,
    });
    files.push(GeneratedFile {
        path: internal.join("bootstrap").join("mod.rs"),
        contents: render_bootstrap(&entries, &top),
    });
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use supaform_types::{Column, ColumnRef, PolicyCommand, Relation, RelationKind, Resource, Role};

    fn entry(path: &str, name: &str) -> Entry {
        Entry {
            path: PathBuf::from(path),
            struct_name: name.into(),
        }
    }

    fn file<'a>(files: &'a [GeneratedFile], path: &str) -> &'a str {
        files
            .iter()
            .find(|f| f.path == Path::new(path))
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("{path} not generated"))
    }

    #[test]
    fn writes_only_marked_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("internal/models")).unwrap();
        std::fs::write(root.join("internal/models/custom.rs"), "pub struct Custom;\n").unwrap();

        let generated = |path: &str, body: &str| GeneratedFile {
            path: PathBuf::from(path),
            contents: format!("{MARKER}\n\n{body}"),
        };
        let files = vec![
            generated("internal/models/courses.rs", "pub struct Courses;\n"),
            generated("internal/models/custom.rs", "pub struct Custom;\n"),
        ];

        let reports = write_files(&files, root, true).unwrap();
        let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, [WriteOutcome::Written, WriteOutcome::Skipped]);
        assert_eq!(
            std::fs::read_to_string(root.join("internal/models/custom.rs")).unwrap(),
            "pub struct Custom;\n"
        );

        let again = write_files(&files[..1], root, true).unwrap();
        assert_eq!(again[0].outcome, WriteOutcome::Unchanged);

        let forced = write_files(&files[1..], root, false).unwrap();
        assert_eq!(forced[0].outcome, WriteOutcome::Written);
        assert!(
            std::fs::read_to_string(root.join("internal/models/custom.rs"))
                .unwrap()
                .starts_with(MARKER)
        );
    }

    #[test]
    fn preview_leaves_the_disk_alone() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![GeneratedFile {
            path: PathBuf::from("internal/mod.rs"),
            contents: format!("{MARKER}\n"),
        }];
        let reports = preview_files(&files, dir.path(), true).unwrap();
        assert_eq!(reports[0].outcome, WriteOutcome::Written);
        assert!(!dir.path().join("internal").exists());
    }

    #[test]
    fn module_and_bootstrap_files() {
        let entries = vec![
            entry("roles/editor.rs", "Editor"),
            entry("models/lessons.rs", "Lessons"),
            entry("models/courses.rs", "Courses"),
            entry("models/courses.rs", "CourseDraft"),
            entry("models/billing/invoices.rs", "Invoices"),
            entry("models/type.rs", "Type"),
        ];
        let files = index_files(&entries);

        assert_eq!(
            file(&files, "internal/models/mod.rs"),
            format!(
                "{MARKER}\n\nmod courses;\nmod lessons;\nmod r#type;\nmod billing;\n\n\
                 pub use courses::{{Courses, CourseDraft}};\npub use lessons::Lessons;\n\
                 pub use r#type::Type;\npub use billing::*;\n"
            )
        );
        assert_eq!(
            file(&files, "internal/models/billing/mod.rs"),
            format!("{MARKER}\n\nmod invoices;\n\npub use invoices::Invoices;\n")
        );
        assert_eq!(
            file(&files, "internal/mod.rs"),
            format!("{MARKER}\n\npub mod bootstrap;\npub mod models;\npub mod roles;\n")
        );
        assert_eq!(
            file(&files, "internal/bootstrap/mod.rs"),
            format!(
                "{MARKER}\n\nuse supaform::prelude::*;\n\nuse super::{{models, roles}};\n\n\
                 /// Every declaration of the project, in registration order.\n\
                 pub fn declarations() -> Vec<Declaration> {{\n    vec![\n\
                 \x20       models::Invoices::declaration(),\n\
                 \x20       models::Courses::declaration(),\n\
                 \x20       models::CourseDraft::declaration(),\n\
                 \x20       models::Lessons::declaration(),\n\
                 \x20       models::Type::declaration(),\n\
                 \x20       roles::Editor::declaration(),\n    ]\n}}\n"
            )
        );
    }

    #[test]
    fn empty_project_bootstraps_nothing() {
        let files = index_files(&[]);
        assert_eq!(files.len(), 2);
        assert!(file(&files, "internal/bootstrap/mod.rs").contains("    Vec::new()\n"));
    }

    fn remote() -> ResourceSet {
        let mut set = ResourceSet::new();
        set.insert(Resource::Table(
            Table::new("public", "courses")
                .column(Column::new("id", "bigint").primary().auto_increment())
                .column(Column::new("owner_id", "uuid")),
        ));
        set.insert(Resource::Table(
            Table::new("public", "lessons")
                .column(Column::new("id", "bigint").primary().auto_increment())
                .column(Column::new("course_id", "bigint").not_null()),
        ));
        set.insert(Resource::Table(
            Table::new("auth", "users").column(Column::new("id", "uuid").primary()),
        ));
        set.insert(Resource::Relation(Relation::new(
            ColumnRef::new("public", "lessons", "course_id"),
            ColumnRef::new("public", "courses", "id"),
            RelationKind::HasOne,
        )));
        set.insert(Resource::Relation(Relation::new(
            ColumnRef::new("public", "courses", "owner_id"),
            ColumnRef::new("auth", "users", "id"),
            RelationKind::HasOne,
        )));
        set.insert(Resource::Policy(
            Policy::new("public", "courses", "courses_read", PolicyCommand::Select)
                .to(["anon"])
                .using("true"),
        ));
        set.insert(Resource::Policy(
            Policy::new("storage", "objects", "loose", PolicyCommand::Select).to(["anon"]),
        ));
        set.insert(Resource::Role(Role::new("editor")));
        set.insert(Resource::Role(Role::new("authenticator")));
        set
    }

    #[test]
    fn remote_resources_become_files() {
        let ctx = Context::new("/project");
        let generated = generate_remote(&remote(), &ctx);

        let paths: Vec<_> = generated
            .files
            .iter()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            paths,
            [
                "internal/models/courses.rs",
                "internal/models/lessons.rs",
                "internal/roles/editor.rs",
            ]
        );
        let courses = file(&generated.files, "internal/models/courses.rs");
        assert!(courses.contains("    pub lessons: Vec<Lessons>,\n"));
        assert!(courses.contains("read = \"anon\""));
        assert!(!courses.contains("readUsing"));
        assert!(!courses.contains("users"));
        let lessons = file(&generated.files, "internal/models/lessons.rs");
        assert!(lessons.contains("use super::Courses;\n"));
        assert!(lessons.contains("    pub course: Option<Box<Courses>>,\n"));

        assert_eq!(generated.warnings.len(), 1);
        assert!(generated.warnings[0].contains("not scoped to a bucket"));
        assert_eq!(generated.entries[0], entry("models/courses.rs", "Courses"));
    }

    #[test]
    fn selection_limits_what_is_generated() {
        let ctx = Context::new("/project")
            .with_selection(crate::context::Selection::only(false, true, false, false));
        let generated = generate_remote(&remote(), &ctx);
        let paths: Vec<_> = generated.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("internal/roles/editor.rs")]);
    }

    #[test]
    fn colliding_struct_names_are_numbered() {
        let mut set = ResourceSet::new();
        set.insert(Resource::Table(Table::new("public", "course_items")));
        set.insert(Resource::Table(Table::new("public", "CourseItems")));
        let generated = generate_remote(&set, &Context::new("/project"));
        let names: Vec<_> = generated.entries.iter().map(|e| e.struct_name.as_str()).collect();
        assert_eq!(names, ["CourseItems", "CourseItems2"]);
        assert_eq!(generated.files[1].path, Path::new("internal/models/course_items2.rs"));
    }
}
