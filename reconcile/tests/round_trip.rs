//! Importing remote resources and reconciling the imported sources

mod common;

use common::{FakePgMeta, course_platform, read, write};
use serde_json::json;
use supaform_reconcile::{Context, MARKER, Reconciler, Selection, WriteOutcome};
use tempfile::TempDir;

fn project() -> (TempDir, Context) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::new(dir.path());
    (dir, ctx)
}

#[tokio::test]
async fn imports_write_one_file_per_resource() {
    let (dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    let outcome = reconciler.imports().await.unwrap();

    let mut paths: Vec<String> = outcome
        .files
        .iter()
        .map(|f| f.path.to_string_lossy().replace('\\', "/"))
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        [
            "internal/bootstrap/mod.rs",
            "internal/mod.rs",
            "internal/models/courses.rs",
            "internal/models/lessons.rs",
            "internal/models/mod.rs",
            "internal/roles/editor.rs",
            "internal/roles/mod.rs",
            "internal/roles/owner.rs",
            "internal/roles/reader.rs",
            "internal/rpc/course_titles.rs",
            "internal/rpc/mod.rs",
            "internal/storages/avatars.rs",
            "internal/storages/mod.rs",
            "internal/types/mod.rs",
            "internal/types/status.rs",
        ]
    );
    assert!(outcome.files.iter().all(|f| f.outcome == WriteOutcome::Written));
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let root = dir.path();
    for file in &outcome.files {
        assert!(read(root, &file.path.to_string_lossy()).starts_with(MARKER));
    }
}

#[tokio::test]
async fn policy_tags_take_the_canonical_form() {
    let (dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    reconciler.imports().await.unwrap();

    let courses = read(dir.path(), "internal/models/courses.rs");
    assert!(courses.contains("    read = \"anon,authenticated\",\n"));
    assert!(courses.contains("    write = \"owner\",\n"));
    assert!(courses.contains("    writeUsing = \"owner_id = auth.uid()\",\n"));
    assert!(!courses.contains("readUsing"));
    assert!(!courses.contains("writeCheck"));
    assert!(courses.contains("/// Published and draft courses\n"));
    assert!(courses.contains("    pub lessons: Vec<Lessons>,\n"));
    assert!(courses.contains("    #[column(\"name:status;type:status;default:'draft'\")]\n"));
    assert!(courses.contains("    pub owner_id: Option<Uuid>,\n"));
}

#[tokio::test]
async fn storage_rules_lose_their_bucket_scope() {
    let (dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    reconciler.imports().await.unwrap();

    let avatars = read(dir.path(), "internal/storages/avatars.rs");
    assert!(avatars.contains("    readUsing = \"owner = auth.uid()\",\n"));
    assert!(!avatars.contains("bucket_id"));
    assert!(avatars.contains("    fileSizeLimit = 1048576,\n"));
}

#[tokio::test]
async fn rpc_references_become_bound_aliases() {
    let (dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    reconciler.imports().await.unwrap();

    let rpc = read(dir.path(), "internal/rpc/course_titles.rs");
    assert!(rpc.contains("    models = \"c:Courses\",\n"));
    assert!(rpc.contains(
        "    definition = r#\"select c.title from :c c where c.owner_id = auth.uid()\"#,\n"
    ));
    assert!(rpc.contains("pub struct CourseTitles;\n"));
}

/// The course platform plus an enrollments table and a function joining all
/// three public tables.
fn with_enrollments() -> serde_json::Value {
    let mut fixture = course_platform();
    let enrollment_course = json!({
        "constraint_name": "enrollments_course_id_fkey",
        "source_schema": "public",
        "source_table_name": "enrollments",
        "source_column_name": "course_id",
        "target_table_schema": "public",
        "target_table_name": "courses",
        "target_column_name": "id",
    });
    let tables = fixture["tables"].as_array_mut().unwrap();
    tables[0]["relationships"]
        .as_array_mut()
        .unwrap()
        .push(enrollment_course.clone());
    tables.push(json!({
        "schema": "public",
        "name": "enrollments",
        "rls_enabled": false,
        "rls_forced": false,
        "primary_keys": [{ "name": "id" }],
        "relationships": [enrollment_course],
        "columns": [
            {
                "name": "id",
                "ordinal_position": 1,
                "data_type": "bigint",
                "format": "int8",
                "is_identity": true,
                "is_nullable": false,
            },
            { "name": "course_id", "ordinal_position": 2, "data_type": "bigint", "format": "int8", "is_nullable": false },
            { "name": "user_id", "ordinal_position": 3, "data_type": "uuid", "format": "uuid", "is_nullable": false },
        ],
    }));
    fixture["functions"].as_array_mut().unwrap().push(json!({
        "schema": "public",
        "name": "my_lessons",
        "language": "sql",
        "definition": ENROLLED_LESSONS,
        "argument_types": "",
        "return_type": "SETOF bigint",
        "behavior": "STABLE",
        "security_definer": false,
    }));
    fixture
}

const ENROLLED_LESSONS: &str = "select l.id from courses c \
inner join lessons l on l.course_id = c.id \
inner join enrollments e on e.course_id = c.id \
where e.user_id = auth.uid()";

#[tokio::test]
async fn functions_over_several_models_round_trip() {
    let (dir, ctx) = project();
    Reconciler::new(FakePgMeta::from_json(with_enrollments()), ctx.clone())
        .imports()
        .await
        .unwrap();

    let rpc = read(dir.path(), "internal/rpc/my_lessons.rs");
    assert!(rpc.contains("    models = \"c:Courses,l:Lessons,e:Enrollments\",\n"));
    assert!(rpc.contains(
        "select l.id from :c c inner join :l l on l.course_id = c.id \
inner join :e e on e.course_id = c.id where e.user_id = auth.uid()"
    ));
    assert!(rpc.contains("pub struct MyLessons;\n"));

    // substituting the bindings again reproduces the remote definition
    let reconciler =
        Reconciler::new(FakePgMeta::from_json(with_enrollments()), ctx.dry_run(true));
    let outcome = reconciler.apply().await.unwrap();
    assert!(outcome.plan.is_empty(), "{}", outcome.report);
}

#[tokio::test]
async fn imported_sources_reconcile_to_no_changes() {
    let (dir, ctx) = project();
    Reconciler::new(FakePgMeta::from_json(course_platform()), ctx.clone())
        .imports()
        .await
        .unwrap();

    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx.dry_run(true));
    let outcome = reconciler.apply().await.unwrap();
    assert!(outcome.plan.is_empty(), "{}", outcome.report);
    assert_eq!(outcome.report, "No changes.\n");
    assert!(outcome.applied.is_none());
    assert!(reconciler.api().queries().is_empty());
    drop(dir);
}

#[tokio::test]
async fn importing_twice_changes_nothing() {
    let (_dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    reconciler.imports().await.unwrap();
    let again = reconciler.imports().await.unwrap();
    assert!(again.files.iter().all(|f| f.outcome == WriteOutcome::Unchanged));
}

#[tokio::test]
async fn hand_written_files_are_kept() {
    let (dir, ctx) = project();
    let custom = "#[derive(Role)]\n#[role(name = \"owner\")]\npub struct Owner;\n";
    write(dir.path(), "internal/roles/owner.rs", custom);

    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    let outcome = reconciler.imports().await.unwrap();
    let owner = outcome
        .files
        .iter()
        .find(|f| f.path.ends_with("roles/owner.rs"))
        .unwrap();
    assert_eq!(owner.outcome, WriteOutcome::Skipped);
    assert_eq!(read(dir.path(), "internal/roles/owner.rs"), custom);
    assert!(read(dir.path(), "internal/roles/mod.rs").contains("pub use owner::Owner;\n"));
}

#[tokio::test]
async fn force_overwrites_hand_written_files() {
    let (dir, ctx) = project();
    write(dir.path(), "internal/roles/owner.rs", "pub struct Owner;\n");

    let reconciler = Reconciler::new(
        FakePgMeta::from_json(course_platform()),
        ctx.merge_safe(false),
    );
    reconciler.imports().await.unwrap();
    assert!(read(dir.path(), "internal/roles/owner.rs").starts_with(MARKER));
}

#[tokio::test]
async fn dry_run_imports_only_list_files() {
    let (dir, ctx) = project();
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx.dry_run(true));
    let outcome = reconciler.imports().await.unwrap();
    assert!(!outcome.files.is_empty());
    assert!(!dir.path().join("internal").exists());
}

#[tokio::test]
async fn selection_limits_the_import() {
    let (dir, ctx) = project();
    let ctx = ctx.with_selection(Selection::only(false, true, false, false));
    let reconciler = Reconciler::new(FakePgMeta::from_json(course_platform()), ctx);
    reconciler.imports().await.unwrap();

    assert!(dir.path().join("internal/roles/editor.rs").exists());
    assert!(!dir.path().join("internal/models").exists());
    let bootstrap = read(dir.path(), "internal/bootstrap/mod.rs");
    assert!(bootstrap.contains("        roles::Editor::declaration(),\n"));
    assert!(!bootstrap.contains("models::"));
}
