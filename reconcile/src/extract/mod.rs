//! Local declarations from project sources
//!
//! The extractor walks `internal/{models,roles,rpc,storages,types}` below the
//! project root, parses every `.rs` file and collects the declarations of
//! items deriving `Model`, `Rpc`, `Role`, `Bucket` or `PgType`. The records
//! are then turned into resources by [`materialize`] and checked against the
//! remote side by [`validate`].

mod materialize;
pub mod parser;
mod validate;

use std::path::{Path, PathBuf};

use supaform_types::Declaration;
use tracing::{debug, info};

use crate::context::{Context, SOURCE_DIRS};
use crate::error::{Error, Result};

pub use materialize::materialize;
pub use parser::parse_declarations;
pub use validate::validate;

/// A declaration together with the file it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDecl {
    pub path: PathBuf,
    pub declaration: Declaration,
}

/// Source files of the selected declaration directories, sorted per directory.
pub fn source_files(ctx: &Context) -> Result<Vec<PathBuf>> {
    let internal = ctx.internal_dir();
    let mut files = Vec::new();

    for dir in SOURCE_DIRS {
        if !ctx.selection.includes_dir(dir) {
            continue;
        }
        let pattern = internal.join(dir).join("**").join("*.rs");
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| Error::Parse {
            path: internal.join(dir),
            message: e.to_string(),
        })?;
        for entry in entries {
            let path = entry.map_err(|e| {
                let source = std::io::Error::new(e.error().kind(), e.to_string());
                Error::io(e.path().to_path_buf(), source)
            })?;
            files.push(path);
        }
    }
    Ok(files)
}

/// Parse one file's text.
pub fn extract_source(path: &Path, source: &str) -> Result<Vec<SourceDecl>> {
    let declarations = parse_declarations(source).map_err(|message| Error::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(declarations
        .into_iter()
        .map(|declaration| SourceDecl {
            path: path.to_path_buf(),
            declaration,
        })
        .collect())
}

/// Every declaration under the project's `internal/` tree.
pub fn extract(ctx: &Context) -> Result<Vec<SourceDecl>> {
    let mut out = Vec::new();
    for path in source_files(ctx)? {
        let source = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let found = extract_source(&path, &source)?;
        debug!(path = %path.display(), declarations = found.len(), "parsed source file");
        out.extend(found);
    }
    info!(declarations = out.len(), "local declarations extracted");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Selection;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn walks_selected_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "internal/roles/editor.rs",
            "#[derive(Role)]\n#[role(name = \"editor\")]\npub struct Editor;\n",
        );
        write(
            dir.path(),
            "internal/models/nested/courses.rs",
            "#[derive(Model)]\n#[model(table = \"courses\")]\npub struct Courses {\n    pub id: i64,\n}\n",
        );
        write(dir.path(), "internal/bootstrap/mod.rs", "#[derive(Role)]\nstruct Ignored;\n");

        let all = extract(&Context::new(dir.path())).unwrap();
        let names: Vec<_> = all.iter().map(|d| d.declaration.struct_name()).collect();
        assert_eq!(names, ["Courses", "Editor"]);
        assert!(all[0].path.ends_with("internal/models/nested/courses.rs"));

        let roles = Context::new(dir.path())
            .with_selection(Selection::only(false, true, false, false));
        assert_eq!(extract(&roles).unwrap().len(), 1);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "internal/roles/broken.rs",
            "#[derive(Role)]\n#[role(colour = \"red\")]\npub struct Broken;\n",
        );
        let err = extract(&Context::new(dir.path())).unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("broken.rs"));
    }
}
