//! Derived declarations match the ones read from source text

#![cfg(feature = "reconcile")]

use std::path::Path;

use supaform::prelude::*;
use supaform::reconcile::extract::extract_source;
use supaform::types::{Declaration, Declared};

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
#[model(table = "courses", read = "anon,authenticated", write = "owner", writeUsing = "owner_id = auth.uid()")]
pub struct Courses {
    #[column("primaryKey;autoIncrement")]
    pub id: i64,
    pub title: String,
    #[serde(rename = "ownerId")]
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

const COURSES: &str = r#"
#[derive(Debug, Clone, Serialize, Deserialize, Model)]
#[model(table = "courses", read = "anon,authenticated", write = "owner", writeUsing = "owner_id = auth.uid()")]
pub struct Courses {
    #[column("primaryKey;autoIncrement")]
    pub id: i64,
    pub title: String,
    #[serde(rename = "ownerId")]
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
"#;

#[derive(Debug, Clone, Copy, Default, Role)]
#[role(name = "editor", connectionLimit = 60, inherits = "reader")]
pub struct Editor;

const EDITOR: &str = r#"
#[derive(Debug, Clone, Copy, Default, Role)]
#[role(name = "editor", connectionLimit = 60, inherits = "reader")]
pub struct Editor;
"#;

#[derive(Bucket)]
#[bucket(name = "avatars", public = false, allowedMimeTypes = "image/png,image/jpeg", fileSizeLimit = 1048576)]
pub struct Avatars;

const AVATARS: &str = r#"
#[derive(Bucket)]
#[bucket(name = "avatars", public = false, allowedMimeTypes = "image/png,image/jpeg", fileSizeLimit = 1048576)]
pub struct Avatars;
"#;

fn parsed(source: &str) -> Declaration {
    let mut found = extract_source(Path::new("internal/test.rs"), source).unwrap();
    assert_eq!(found.len(), 1);
    found.remove(0).declaration
}

#[test]
fn model_derive_matches_source() {
    let derived = Courses::declaration();
    assert_eq!(derived, parsed(COURSES));

    let Declaration::Model(model) = derived else {
        panic!("expected a model");
    };
    assert_eq!(model.table.as_deref(), Some("courses"));
    assert_eq!(model.fields.len(), 4);
    assert_eq!(model.fields[2].rust_type, "Option<Uuid>");
    assert_eq!(model.fields[2].serde_rename.as_deref(), Some("ownerId"));
}

#[test]
fn role_and_bucket_derives_match_source() {
    assert_eq!(Editor::declaration(), parsed(EDITOR));
    assert_eq!(Avatars::declaration(), parsed(AVATARS));
}
